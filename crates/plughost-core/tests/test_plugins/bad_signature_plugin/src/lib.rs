#![allow(dead_code, non_upper_case_globals)] // Legacy exports are named after capabilities

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

#[repr(C)]
pub struct FfiReply {
    pub result: *mut c_char,
    pub error: *mut c_char,
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
pub static Meta: Export = Export(LegacyExport {
    signature: b"fn() -> metadata\0".as_ptr() as *const c_char,
    function: meta as *const c_void,
});

// Declares a shape the host does not understand.
#[no_mangle]
pub static Health: Export = Export(LegacyExport {
    signature: b"fn() -> bool\0".as_ptr() as *const c_char,
    function: health as *const c_void,
});

// Right signature, but no function behind it.
#[no_mangle]
pub static RunTests: Export = Export(LegacyExport {
    signature: b"fn() -> error\0".as_ptr() as *const c_char,
    function: std::ptr::null(),
});

#[no_mangle]
pub static Contacts: Export = Export(LegacyExport {
    signature: b"fn(credentials, contact_params) -> (contacts, error)\0".as_ptr() as *const c_char,
    function: contacts as *const c_void,
});

extern "C-unwind" fn meta() -> *mut c_char {
    CString::new(r#"{"id":"bad_signature_plugin","name":"Bad Signature","contract_version":"2.1.0"}"#)
        .unwrap()
        .into_raw()
}

extern "C-unwind" fn health() -> bool {
    true
}

extern "C-unwind" fn contacts(_credentials: *const c_char, _params: *const c_char) -> FfiReply {
    FfiReply {
        result: CString::new(r#"{"contacts":[],"count":0,"total":0}"#).unwrap().into_raw(),
        error: std::ptr::null_mut(),
    }
}

// No _free_string export: the host leaks returned strings instead of freeing
// them with the wrong allocator.
