//! # Artifact ABI
//!
//! The C-compatible surface an artifact exports. Two shapes are understood:
//!
//! - **Tier 1 (typed)**: a single `_plugin_capabilities` function returning a
//!   pointer to a [`CapabilityVTable`]. The table must carry the expected
//!   [`CAPABILITY_ABI_VERSION`] and its own size.
//! - **Tier 2 (legacy)**: one [`LegacyExport`] static per capability, named
//!   after the capability (`Meta`, `Health`, `RunTests`, `Contacts`,
//!   `Ledger`). Each export carries a signature string the host checks
//!   before calling through it.
//!
//! Structured values cross the boundary as NUL-terminated UTF-8 JSON.
//! Strings returned by the artifact are owned by it and handed back through
//! its `free_string` function.
use std::ffi::c_void;
use std::os::raw::c_char;

/// Revision of the Tier 1 table layout
pub const CAPABILITY_ABI_VERSION: u32 = 1;

/// Tier 1 entry point symbol
pub const CAPABILITIES_SYMBOL: &[u8] = b"_plugin_capabilities\0";

/// Optional Tier 2 deallocator symbol
pub const LEGACY_FREE_STRING_SYMBOL: &[u8] = b"_free_string\0";

/// Tier 1 entry point type
pub type CapabilitiesInitFn = unsafe extern "C-unwind" fn() -> *const CapabilityVTable;

/// Returns an artifact-owned string (JSON for metadata, plain text for health).
pub type StringFn = extern "C-unwind" fn(instance: *const c_void) -> *mut c_char;
/// Returns null on success or an artifact-owned error message.
pub type SelfTestFn = extern "C-unwind" fn(instance: *const c_void) -> *mut c_char;
/// Domain query: credentials JSON and params JSON in, reply out.
pub type QueryFn = extern "C-unwind" fn(
    instance: *const c_void,
    credentials: *const c_char,
    params: *const c_char,
) -> FfiReply;
pub type FreeStringFn = extern "C-unwind" fn(ptr: *mut c_char);

/// Result of a domain query. Exactly one of the fields is expected to be
/// non-null; a non-null `error` wins.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiReply {
    pub result: *mut c_char,
    pub error: *mut c_char,
}

/// Tier 1 capability table.
#[repr(C)]
pub struct CapabilityVTable {
    /// Must equal [`CAPABILITY_ABI_VERSION`]
    pub abi_version: u32,
    /// Must equal `size_of::<CapabilityVTable>()`
    pub struct_size: usize,
    /// Opaque state passed back to every call
    pub instance: *const c_void,
    pub meta: StringFn,
    pub health: StringFn,
    /// The self-test capability is optional
    pub run_tests: Option<SelfTestFn>,
    pub contacts: QueryFn,
    pub ledger: QueryFn,
    pub free_string: FreeStringFn,
}

/// Tier 2 export descriptor.
#[repr(C)]
pub struct LegacyExport {
    /// NUL-terminated signature, compared against [`signatures`]
    pub signature: *const c_char,
    /// Function pointer of the type the signature names
    pub function: *const c_void,
}

/// Tier 2 function shapes, matched against [`LegacyExport::function`].
pub type LegacyStringFn = extern "C-unwind" fn() -> *mut c_char;
pub type LegacySelfTestFn = extern "C-unwind" fn() -> *mut c_char;
pub type LegacyQueryFn =
    extern "C-unwind" fn(credentials: *const c_char, params: *const c_char) -> FfiReply;

/// Expected Tier 2 signature strings.
pub mod signatures {
    pub const META: &str = "fn() -> metadata";
    pub const HEALTH: &str = "fn() -> string";
    pub const RUN_TESTS: &str = "fn() -> error";
    pub const CONTACTS: &str = "fn(credentials, contact_params) -> (contacts, error)";
    pub const LEDGER: &str = "fn(credentials, ledger_params) -> (ledger, error)";
}
