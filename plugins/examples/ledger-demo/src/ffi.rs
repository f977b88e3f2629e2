//! Typed capability table exported to the host.
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::ptr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use plughost_core::plugin_system::abi::{CAPABILITY_ABI_VERSION, CapabilityVTable, FfiReply};
use plughost_core::plugin_system::models::{ContactQueryParams, LedgerQueryParams};

use crate::LedgerDemo;

struct ExportedTable(CapabilityVTable);

// The table is immutable and its instance pointer is never dereferenced.
unsafe impl Sync for ExportedTable {}

static TABLE: ExportedTable = ExportedTable(CapabilityVTable {
    abi_version: CAPABILITY_ABI_VERSION,
    struct_size: std::mem::size_of::<CapabilityVTable>(),
    instance: ptr::null(),
    meta: ffi_meta,
    health: ffi_health,
    run_tests: Some(ffi_run_tests),
    contacts: ffi_contacts,
    ledger: ffi_ledger,
    free_string: ffi_free_string,
});

#[unsafe(no_mangle)]
pub extern "C-unwind" fn _plugin_capabilities() -> *const CapabilityVTable {
    &TABLE.0
}

fn into_c_string(value: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(value).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

fn read_json<T: DeserializeOwned + Default>(ptr: *const c_char) -> Result<T, String> {
    if ptr.is_null() {
        return Ok(T::default());
    }
    let raw = unsafe { CStr::from_ptr(ptr) }.to_string_lossy();
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw).map_err(|e| format!("invalid params: {}", e))
}

fn reply<T: Serialize>(result: Result<T, String>) -> FfiReply {
    match result.and_then(|value| serde_json::to_string(&value).map_err(|e| e.to_string())) {
        Ok(json) => FfiReply { result: into_c_string(json), error: ptr::null_mut() },
        Err(message) => {
            log::debug!("ledger-demo query failed: {}", message);
            FfiReply { result: ptr::null_mut(), error: into_c_string(message) }
        }
    }
}

extern "C-unwind" fn ffi_meta(_instance: *const c_void) -> *mut c_char {
    match serde_json::to_string(&LedgerDemo.metadata()) {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}

extern "C-unwind" fn ffi_health(_instance: *const c_void) -> *mut c_char {
    into_c_string(LedgerDemo.health())
}

extern "C-unwind" fn ffi_run_tests(_instance: *const c_void) -> *mut c_char {
    match LedgerDemo.self_test() {
        Ok(()) => ptr::null_mut(),
        Err(message) => into_c_string(message),
    }
}

// Credentials are accepted and ignored; the data is bundled.
extern "C-unwind" fn ffi_contacts(_instance: *const c_void, _credentials: *const c_char, params: *const c_char) -> FfiReply {
    reply(read_json::<ContactQueryParams>(params).and_then(|params| LedgerDemo.contacts(&params)))
}

extern "C-unwind" fn ffi_ledger(_instance: *const c_void, _credentials: *const c_char, params: *const c_char) -> FfiReply {
    reply(read_json::<LedgerQueryParams>(params).and_then(|params| LedgerDemo.ledger(&params)))
}

extern "C-unwind" fn ffi_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}
