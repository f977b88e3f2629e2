use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::plugin_system::abi::{
    CAPABILITIES_SYMBOL, CAPABILITY_ABI_VERSION, CapabilitiesInitFn, CapabilityVTable, FfiReply,
    FreeStringFn, LEGACY_FREE_STRING_SYMBOL, LegacyExport, LegacyQueryFn, LegacySelfTestFn,
    LegacyStringFn, QueryFn,
};
use crate::plugin_system::capabilities::{
    Availability, Capability, CapabilityError, CapabilityResult, DispatchTier, PluginCapabilities,
};
use crate::plugin_system::error::{PluginSystemError, PluginSystemErrorSource};
use crate::plugin_system::models::{
    ContactQueryParams, Contacts, Credentials, Ledger, LedgerQueryParams, PluginMetadata,
};

/// A dynamically loadable module file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Artifact {
    /// File name without the loader extension; the deduplication key
    pub logical_name: String,
    pub path: PathBuf,
}

impl Artifact {
    /// Builds an artifact for `path` if it carries the platform's loader extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if !has_loader_extension(&path) {
            return None;
        }
        let logical_name = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self { logical_name, path })
    }
}

/// True when `path` ends in the platform's dynamic library extension
/// (`so`, `dylib` or `dll`), compared case-insensitively.
pub fn has_loader_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(std::env::consts::DLL_EXTENSION))
        .unwrap_or(false)
}

/// Opens artifacts into tier-normalized capability adapters.
pub trait ArtifactLoader: Send + Sync {
    fn open(&self, artifact: &Artifact) -> Result<Arc<dyn PluginCapabilities>, PluginSystemError>;
}

// --- FFI Helper Functions ---

pub(crate) fn panic_message(panic_obj: &(dyn std::any::Any + Send)) -> String {
    if let Some(s_ref) = panic_obj.downcast_ref::<&'static str>() {
        (*s_ref).to_string()
    } else if let Some(s_obj) = panic_obj.downcast_ref::<String>() {
        s_obj.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}

/// Copies an artifact-owned C string and hands it back to the artifact.
/// Returns `Ok(None)` for a null pointer.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// until `free` is called on it.
unsafe fn take_ffi_string(
    ptr: *mut c_char,
    free: Option<FreeStringFn>,
) -> Result<Option<String>, CapabilityError> {
    if ptr.is_null() {
        return Ok(None);
    }
    let converted = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(|s| s.to_owned())
        .map_err(|_| CapabilityError::new("plugin returned a non UTF-8 string"));
    if let Some(free_fn) = free {
        free_fn(ptr);
    }
    converted.map(Some)
}

fn to_json_cstring<T: Serialize>(value: &T, what: &str) -> CapabilityResult<CString> {
    let json = serde_json::to_string(value)
        .map_err(|e| CapabilityError::new(format!("failed to encode {}: {}", what, e)))?;
    CString::new(json)
        .map_err(|e| CapabilityError::new(format!("failed to encode {}: {}", what, e)))
}

/// Turns a query reply into a typed value, releasing both strings.
///
/// # Safety
/// Both pointers in `reply` must satisfy the contract of [`take_ffi_string`].
unsafe fn decode_reply<T: DeserializeOwned>(
    reply: FfiReply,
    free: Option<FreeStringFn>,
    what: &str,
) -> CapabilityResult<T> {
    let result = unsafe { take_ffi_string(reply.result, free) };
    let error = unsafe { take_ffi_string(reply.error, free) }?;
    if let Some(message) = error {
        return Err(CapabilityError(message));
    }
    match result? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| CapabilityError::new(format!("malformed {} reply: {}", what, e))),
        None => Err(CapabilityError::new(format!(
            "plugin returned neither {} nor an error",
            what
        ))),
    }
}

fn decode_metadata(json: Option<String>) -> CapabilityResult<PluginMetadata> {
    let json = json.ok_or_else(|| CapabilityError::new("plugin returned no metadata"))?;
    serde_json::from_str(&json)
        .map_err(|e| CapabilityError::new(format!("malformed metadata: {}", e)))
}

fn unavailable(capability: Capability) -> CapabilityError {
    CapabilityError::new(format!("{} is not available", capability))
}

// --- TypedModule (Tier 1) ---

#[derive(Debug, Clone, Copy)]
struct UnsafeVTablePtr(*const CapabilityVTable);
unsafe impl Send for UnsafeVTablePtr {}
unsafe impl Sync for UnsafeVTablePtr {}

/// Adapter over a conforming `_plugin_capabilities` table.
#[derive(Debug)]
pub struct TypedModule {
    name: String,
    vtable: UnsafeVTablePtr,
    // Keeps the code behind `vtable` mapped for as long as the adapter lives.
    _library: Library,
}

impl TypedModule {
    /// Logical name of the artifact this table came from
    pub fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> &CapabilityVTable {
        // Validated non-null in `resolve_typed` and owned by the loaded library.
        unsafe { &*self.vtable.0 }
    }

    fn query<P: Serialize, R: DeserializeOwned>(
        &self,
        function: QueryFn,
        credentials: &Credentials,
        params: &P,
        what: &str,
    ) -> CapabilityResult<R> {
        let table = self.table();
        let credentials = to_json_cstring(credentials, "credentials")?;
        let params = to_json_cstring(params, "query parameters")?;
        let reply = function(table.instance, credentials.as_ptr(), params.as_ptr());
        unsafe { decode_reply(reply, Some(table.free_string), what) }
    }
}

impl PluginCapabilities for TypedModule {
    fn tier(&self) -> DispatchTier {
        DispatchTier::Typed
    }

    fn availability(&self, capability: Capability) -> Availability {
        match capability {
            Capability::RunTests if self.table().run_tests.is_none() => Availability::Missing,
            _ => Availability::Available,
        }
    }

    fn meta(&self) -> CapabilityResult<PluginMetadata> {
        let table = self.table();
        let raw = (table.meta)(table.instance);
        decode_metadata(unsafe { take_ffi_string(raw, Some(table.free_string)) }?)
    }

    fn health(&self) -> CapabilityResult<String> {
        let table = self.table();
        let raw = (table.health)(table.instance);
        unsafe { take_ffi_string(raw, Some(table.free_string)) }?
            .ok_or_else(|| CapabilityError::new("plugin returned no health status"))
    }

    fn run_tests(&self) -> CapabilityResult<()> {
        let table = self.table();
        let run_tests = table.run_tests.ok_or_else(|| unavailable(Capability::RunTests))?;
        let raw = run_tests(table.instance);
        match unsafe { take_ffi_string(raw, Some(table.free_string)) }? {
            None => Ok(()),
            Some(message) => Err(CapabilityError(message)),
        }
    }

    fn contacts(
        &self,
        credentials: &Credentials,
        params: &ContactQueryParams,
    ) -> CapabilityResult<Contacts> {
        self.query(self.table().contacts, credentials, params, "contacts")
    }

    fn ledger(
        &self,
        credentials: &Credentials,
        params: &LedgerQueryParams,
    ) -> CapabilityResult<Ledger> {
        self.query(self.table().ledger, credentials, params, "ledger")
    }
}

// --- LegacySymbolBundle (Tier 2) ---

#[derive(Debug, Clone, Copy)]
struct UnsafeFnPtr(*const c_void);
unsafe impl Send for UnsafeFnPtr {}
unsafe impl Sync for UnsafeFnPtr {}

#[derive(Debug, Clone)]
enum LegacySlot {
    Present(UnsafeFnPtr),
    Missing,
    InvalidSignature(String),
}

/// Adapter over individually exported Tier 2 capabilities.
#[derive(Debug)]
pub struct LegacySymbolBundle {
    name: String,
    slots: [LegacySlot; 5],
    free_string: Option<FreeStringFn>,
    _library: Library,
}

impl LegacySymbolBundle {
    fn resolve(name: &str, library: Library) -> Self {
        let slots = Capability::CANONICAL_ORDER
            .map(|capability| unsafe { resolve_legacy_slot(&library, capability) });
        let free_string = unsafe { library.get::<FreeStringFn>(LEGACY_FREE_STRING_SYMBOL) }
            .ok()
            .map(|symbol| *symbol);
        for (capability, slot) in Capability::CANONICAL_ORDER.iter().zip(slots.iter()) {
            if let LegacySlot::InvalidSignature(found) = slot {
                log::warn!(
                    "Plugin '{}' exports {} with unexpected signature '{}'",
                    name, capability, found
                );
            }
        }
        Self { name: name.to_string(), slots, free_string, _library: library }
    }

    fn slot(&self, capability: Capability) -> &LegacySlot {
        let index = Capability::CANONICAL_ORDER
            .iter()
            .position(|c| *c == capability)
            .unwrap_or_default();
        &self.slots[index]
    }

    fn function(&self, capability: Capability) -> CapabilityResult<*const c_void> {
        match self.slot(capability) {
            LegacySlot::Present(ptr) => Ok(ptr.0),
            LegacySlot::Missing => Err(unavailable(capability)),
            LegacySlot::InvalidSignature(_) => Err(CapabilityError::new("invalid signature")),
        }
    }

    fn query<P: Serialize, R: DeserializeOwned>(
        &self,
        capability: Capability,
        credentials: &Credentials,
        params: &P,
        what: &str,
    ) -> CapabilityResult<R> {
        let raw = self.function(capability)?;
        // Signature string was checked when the slot was resolved.
        let function: LegacyQueryFn =
            unsafe { std::mem::transmute::<*const c_void, LegacyQueryFn>(raw) };
        let credentials = to_json_cstring(credentials, "credentials")?;
        let params = to_json_cstring(params, "query parameters")?;
        let reply = function(credentials.as_ptr(), params.as_ptr());
        unsafe { decode_reply(reply, self.free_string, what) }
    }
}

/// # Safety
/// A symbol named after a capability must be a [`LegacyExport`] static.
unsafe fn resolve_legacy_slot(library: &Library, capability: Capability) -> LegacySlot {
    let symbol: Symbol<*const LegacyExport> = match unsafe { library.get(capability.symbol()) } {
        Ok(symbol) => symbol,
        Err(_) => return LegacySlot::Missing,
    };
    let export_ptr: *const LegacyExport = *symbol;
    if export_ptr.is_null() {
        return LegacySlot::InvalidSignature("<null export>".to_string());
    }
    let export = unsafe { &*export_ptr };
    if export.signature.is_null() || export.function.is_null() {
        return LegacySlot::InvalidSignature("<null signature or function>".to_string());
    }
    match unsafe { CStr::from_ptr(export.signature) }.to_str() {
        Ok(found) if found == capability.expected_signature() => {
            LegacySlot::Present(UnsafeFnPtr(export.function))
        }
        Ok(found) => LegacySlot::InvalidSignature(found.to_string()),
        Err(_) => LegacySlot::InvalidSignature("<non UTF-8 signature>".to_string()),
    }
}

impl PluginCapabilities for LegacySymbolBundle {
    fn tier(&self) -> DispatchTier {
        DispatchTier::Legacy
    }

    fn availability(&self, capability: Capability) -> Availability {
        match self.slot(capability) {
            LegacySlot::Present(_) => Availability::Available,
            LegacySlot::Missing => Availability::Missing,
            LegacySlot::InvalidSignature(_) => Availability::InvalidSignature,
        }
    }

    fn meta(&self) -> CapabilityResult<PluginMetadata> {
        let raw = self.function(Capability::Meta)?;
        let function: LegacyStringFn =
            unsafe { std::mem::transmute::<*const c_void, LegacyStringFn>(raw) };
        decode_metadata(unsafe { take_ffi_string(function(), self.free_string) }?)
    }

    fn health(&self) -> CapabilityResult<String> {
        let raw = self.function(Capability::Health)?;
        let function: LegacyStringFn =
            unsafe { std::mem::transmute::<*const c_void, LegacyStringFn>(raw) };
        unsafe { take_ffi_string(function(), self.free_string) }?
            .ok_or_else(|| {
                CapabilityError::new(format!("plugin '{}' returned no health status", self.name))
            })
    }

    fn run_tests(&self) -> CapabilityResult<()> {
        let raw = self.function(Capability::RunTests)?;
        let function: LegacySelfTestFn =
            unsafe { std::mem::transmute::<*const c_void, LegacySelfTestFn>(raw) };
        match unsafe { take_ffi_string(function(), self.free_string) }? {
            None => Ok(()),
            Some(message) => Err(CapabilityError(message)),
        }
    }

    fn contacts(
        &self,
        credentials: &Credentials,
        params: &ContactQueryParams,
    ) -> CapabilityResult<Contacts> {
        self.query(Capability::Contacts, credentials, params, "contacts")
    }

    fn ledger(
        &self,
        credentials: &Credentials,
        params: &LedgerQueryParams,
    ) -> CapabilityResult<Ledger> {
        self.query(Capability::Ledger, credentials, params, "ledger")
    }
}

// --- LibraryLoader ---

/// Opens artifacts with `libloading`, preferring the typed table and falling
/// back to individually exported symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryLoader;

impl LibraryLoader {
    pub fn new() -> Self {
        Self
    }

    /// Looks for a conforming Tier 1 table. `Ok(None)` means the artifact
    /// should be treated as a legacy symbol bundle.
    ///
    /// # Safety
    /// A `_plugin_capabilities` export must have the [`CapabilitiesInitFn`] shape.
    unsafe fn resolve_typed(
        library: &Library,
        artifact: &Artifact,
    ) -> Result<Option<*const CapabilityVTable>, PluginSystemError> {
        let init_symbol: Symbol<CapabilitiesInitFn> =
            match unsafe { library.get(CAPABILITIES_SYMBOL) } {
                Ok(symbol) => symbol,
                Err(_) => return Ok(None),
            };
        let func_to_call: CapabilitiesInitFn = *init_symbol;

        let vtable_ptr = panic::catch_unwind(|| unsafe { func_to_call() }).map_err(|panic_obj| {
            PluginSystemError::FfiError {
                plugin_id: artifact.logical_name.clone(),
                operation: "_plugin_capabilities".to_string(),
                message: format!("panic: {}", panic_message(panic_obj.as_ref())),
            }
        })?;

        if vtable_ptr.is_null() {
            log::warn!(
                "Plugin '{}' exports _plugin_capabilities but returned a null table; \
                 falling back to legacy symbols",
                artifact.logical_name
            );
            return Ok(None);
        }
        let table = unsafe { &*vtable_ptr };
        let expected_size = std::mem::size_of::<CapabilityVTable>();
        if table.abi_version != CAPABILITY_ABI_VERSION || table.struct_size != expected_size {
            log::warn!(
                "Plugin '{}' capability table does not conform \
                 (abi {} size {}, expected abi {} size {}); falling back to legacy symbols",
                artifact.logical_name,
                table.abi_version,
                table.struct_size,
                CAPABILITY_ABI_VERSION,
                expected_size
            );
            return Ok(None);
        }
        Ok(Some(vtable_ptr))
    }
}

impl ArtifactLoader for LibraryLoader {
    fn open(&self, artifact: &Artifact) -> Result<Arc<dyn PluginCapabilities>, PluginSystemError> {
        let library = unsafe { Library::new(&artifact.path) }.map_err(|e| {
            let source = PluginSystemErrorSource::Library(e);
            PluginSystemError::loading(&artifact.logical_name, &artifact.path, source)
        })?;

        match unsafe { Self::resolve_typed(&library, artifact) }? {
            Some(vtable_ptr) => {
                log::debug!("Plugin '{}' uses the typed capability table", artifact.logical_name);
                Ok(Arc::new(TypedModule {
                    name: artifact.logical_name.clone(),
                    vtable: UnsafeVTablePtr(vtable_ptr),
                    _library: library,
                }))
            }
            None => {
                log::debug!("Plugin '{}' uses legacy symbol exports", artifact.logical_name);
                Ok(Arc::new(LegacySymbolBundle::resolve(&artifact.logical_name, library)))
            }
        }
    }
}

/// Reads an artifact's metadata without exercising anything else.
pub fn read_metadata(
    loader: &dyn ArtifactLoader,
    artifact: &Artifact,
) -> Result<PluginMetadata, PluginSystemError> {
    let capabilities = loader.open(artifact)?;
    let metadata_error = |message: String| PluginSystemError::MetadataError {
        plugin_id: artifact.logical_name.clone(),
        message,
    };
    match capabilities.availability(Capability::Meta) {
        Availability::Available => capabilities.meta().map_err(|e| metadata_error(e.0)),
        Availability::Missing => {
            Err(metadata_error("artifact does not export metadata".to_string()))
        }
        Availability::InvalidSignature => Err(metadata_error("invalid Meta signature".to_string())),
    }
}
