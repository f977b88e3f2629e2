use std::fmt;

use crate::plugin_system::abi::signatures;
use crate::plugin_system::models::{
    ContactQueryParams, Contacts, Credentials, Ledger, LedgerQueryParams, PluginMetadata,
};

/// The capabilities the harness knows how to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Meta,
    Health,
    RunTests,
    Contacts,
    Ledger,
}

impl Capability {
    /// Fixed reporting order: metadata check, health check, optional
    /// self-test, then the domain capabilities.
    pub const CANONICAL_ORDER: [Capability; 5] = [
        Capability::Meta,
        Capability::Health,
        Capability::RunTests,
        Capability::Contacts,
        Capability::Ledger,
    ];

    /// Name used in reports and as the Tier 2 export symbol.
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Meta => "Meta",
            Capability::Health => "Health",
            Capability::RunTests => "RunTests",
            Capability::Contacts => "Contacts",
            Capability::Ledger => "Ledger",
        }
    }

    /// NUL-terminated Tier 2 symbol name
    pub fn symbol(&self) -> &'static [u8] {
        match self {
            Capability::Meta => b"Meta\0",
            Capability::Health => b"Health\0",
            Capability::RunTests => b"RunTests\0",
            Capability::Contacts => b"Contacts\0",
            Capability::Ledger => b"Ledger\0",
        }
    }

    pub fn expected_signature(&self) -> &'static str {
        match self {
            Capability::Meta => signatures::META,
            Capability::Health => signatures::HEALTH,
            Capability::RunTests => signatures::RUN_TESTS,
            Capability::Contacts => signatures::CONTACTS,
            Capability::Ledger => signatures::LEDGER,
        }
    }

    /// Optional capabilities report `Skipped` rather than `Missing` when absent.
    pub fn is_optional(&self) -> bool {
        matches!(self, Capability::RunTests)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether an opened artifact can serve a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Missing,
    /// Exported, but not with the expected shape
    InvalidSignature,
}

/// Which of the two artifact shapes an adapter was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTier {
    Typed,
    Legacy,
}

impl fmt::Display for DispatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchTier::Typed => f.write_str("typed"),
            DispatchTier::Legacy => f.write_str("legacy"),
        }
    }
}

/// Failure reported by a capability itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for CapabilityError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CapabilityError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// The full capability set, independent of how the artifact exposes it.
///
/// The dispatcher consults [`availability`](Self::availability) before
/// calling a capability; calling an unavailable one returns an error.
/// Implementations are shared with invocation threads and must therefore be
/// `Send + Sync`.
pub trait PluginCapabilities: Send + Sync {
    fn tier(&self) -> DispatchTier;

    fn availability(&self, capability: Capability) -> Availability;

    fn meta(&self) -> CapabilityResult<PluginMetadata>;

    /// Short status string; `"ok"` is the only passing value.
    fn health(&self) -> CapabilityResult<String>;

    fn run_tests(&self) -> CapabilityResult<()>;

    fn contacts(
        &self,
        credentials: &Credentials,
        params: &ContactQueryParams,
    ) -> CapabilityResult<Contacts>;

    fn ledger(
        &self,
        credentials: &Credentials,
        params: &LedgerQueryParams,
    ) -> CapabilityResult<Ledger>;
}
