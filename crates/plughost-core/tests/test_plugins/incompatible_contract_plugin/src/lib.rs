#![allow(dead_code)]

use std::ffi::{c_void, CString};
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
    health: unreachable_string,
    run_tests: Some(unreachable_string),
    contacts: unreachable_query,
    ledger: unreachable_query,
    free_string,
});

#[no_mangle]
pub extern "C-unwind" fn _plugin_capabilities() -> *const CapabilityVTable {
    &TABLE.0
}

extern "C-unwind" fn meta(_instance: *const c_void) -> *mut c_char {
    CString::new(r#"{"id":"incompatible_contract_plugin","contract_version":"1.0.0"}"#)
        .unwrap()
        .into_raw()
}

// The host must stop after the contract check, so none of these run.
extern "C-unwind" fn unreachable_string(_instance: *const c_void) -> *mut c_char {
    CString::new("called after contract rejection").unwrap().into_raw()
}

extern "C-unwind" fn unreachable_query(_instance: *const c_void, _c: *const c_char, _p: *const c_char) -> FfiReply {
    FfiReply {
        result: std::ptr::null_mut(),
        error: CString::new("called after contract rejection").unwrap().into_raw(),
    }
}

extern "C-unwind" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}
