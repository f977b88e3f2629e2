#![allow(dead_code, non_upper_case_globals)] // Legacy exports are named after capabilities

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

// A table from some other ABI revision, followed by legacy exports the host
// should fall back to.
#[repr(C)]
pub struct ForeignTable {
    pub abi_version: u32,
    pub struct_size: usize,
}

static TABLE: ForeignTable = ForeignTable {
    abi_version: 99,
    struct_size: std::mem::size_of::<ForeignTable>(),
};

#[no_mangle]
pub extern "C-unwind" fn _plugin_capabilities() -> *const ForeignTable {
    &TABLE
}

#[repr(C)]
pub struct LegacyExport {
    pub signature: *const c_char,
    pub function: *const c_void,
}

#[repr(transparent)]
pub struct Export(LegacyExport);
unsafe impl Sync for Export {}

#[no_mangle]
pub static Health: Export = Export(LegacyExport {
    signature: b"fn() -> string\0".as_ptr() as *const c_char,
    function: health as *const c_void,
});

#[no_mangle]
pub static RunTests: Export = Export(LegacyExport {
    signature: b"fn() -> error\0".as_ptr() as *const c_char,
    function: run_tests as *const c_void,
});

extern "C-unwind" fn health() -> *mut c_char {
    CString::new("ok").unwrap().into_raw()
}

extern "C-unwind" fn run_tests() -> *mut c_char {
    CString::new("2 of 5 checks failed").unwrap().into_raw()
}

#[no_mangle]
pub extern "C-unwind" fn _free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}
