#![allow(dead_code)] // Allow unused fields for FFI definition

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

#[repr(C)]
pub struct FfiReply {
    pub result: *mut c_char,
    pub error: *mut c_char,
}

type StringFn = extern "C-unwind" fn(*const c_void) -> *mut c_char;
type QueryFn = extern "C-unwind" fn(*const c_void, *const c_char, *const c_char) -> FfiReply;

#[repr(C)]
pub struct CapabilityVTable {
    pub abi_version: u32,
    pub struct_size: usize,
    pub instance: *const c_void,
    pub meta: StringFn,
    pub health: StringFn,
    pub run_tests: Option<StringFn>,
    pub contacts: QueryFn,
    pub ledger: QueryFn,
    pub free_string: extern "C-unwind" fn(*mut c_char),
}

struct SyncTable(CapabilityVTable);
unsafe impl Sync for SyncTable {}

static TABLE: SyncTable = SyncTable(CapabilityVTable {
    abi_version: 1,
    struct_size: std::mem::size_of::<CapabilityVTable>(),
    instance: std::ptr::null(),
    meta,
    health,
    // No self-test: the host reports it as skipped.
    run_tests: None,
    contacts,
    ledger,
    free_string,
});

#[no_mangle]
pub extern "C-unwind" fn _plugin_capabilities() -> *const CapabilityVTable {
    &TABLE.0
}

fn owned(s: &str) -> *mut c_char {
    CString::new(s).unwrap().into_raw()
}

fn borrowed(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

extern "C-unwind" fn meta(_instance: *const c_void) -> *mut c_char {
    owned(r#"{"id":"typed_plugin","name":"Typed Plugin","version":"0.1.0","author":"plughost tests","contract_version":"2.0.0"}"#)
}

extern "C-unwind" fn health(_instance: *const c_void) -> *mut c_char {
    owned("ok")
}

extern "C-unwind" fn contacts(_instance: *const c_void, _credentials: *const c_char, _params: *const c_char) -> FfiReply {
    FfiReply {
        result: owned(r#"{"source":"typed_plugin","contacts":[{"id":"c1","name":"Ada"}],"count":1,"total":1}"#),
        error: std::ptr::null_mut(),
    }
}

extern "C-unwind" fn ledger(_instance: *const c_void, _credentials: *const c_char, params: *const c_char) -> FfiReply {
    let params = borrowed(params);
    if params.contains(r#""customer_id":"""#) {
        return FfiReply { result: std::ptr::null_mut(), error: owned("customer_id is required") };
    }
    FfiReply {
        result: owned(r#"{"entries":[{"id":1,"date":"2024-01-31","doc_type":"invoice","amount":"120.00"}],"customer_name":"Ada","opening_balance":"0.00"}"#),
        error: std::ptr::null_mut(),
    }
}

extern "C-unwind" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}
