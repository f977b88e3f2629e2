#![allow(dead_code, non_upper_case_globals)] // Legacy exports are named after capabilities

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

#[repr(C)]
pub struct LegacyExport {
    pub signature: *const c_char,
    pub function: *const c_void,
}

#[repr(transparent)]
pub struct Export(LegacyExport);
unsafe impl Sync for Export {}

// Only Health is exported; every other capability is missing.
#[no_mangle]
pub static Health: Export = Export(LegacyExport {
    signature: b"fn() -> string\0".as_ptr() as *const c_char,
    function: health as *const c_void,
});

extern "C-unwind" fn health() -> *mut c_char {
    CString::new("ok").unwrap().into_raw()
}

#[no_mangle]
pub extern "C-unwind" fn _free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}
