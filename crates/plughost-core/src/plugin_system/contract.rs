use crate::kernel::constants;
use crate::plugin_system::version::SemanticVersion;

/// Decides whether an extension's declared contract version is acceptable
/// to this host.
///
/// Holds the host's current and minimum-supported contract versions. Both are
/// fixed when the gate is built and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractGate {
    current: SemanticVersion,
    min_supported: SemanticVersion,
}

impl ContractGate {
    pub fn new(current: SemanticVersion, min_supported: SemanticVersion) -> Self {
        Self { current, min_supported }
    }

    /// Gate built from the contract constants compiled into this host.
    pub fn host() -> Self {
        Self::new(
            SemanticVersion::parse_lenient(constants::CONTRACT_VERSION),
            SemanticVersion::parse_lenient(constants::MIN_SUPPORTED_CONTRACT_VERSION),
        )
    }

    pub fn current(&self) -> SemanticVersion {
        self.current
    }

    pub fn min_supported(&self) -> SemanticVersion {
        self.min_supported
    }

    /// Compatible iff the major versions match and the declared version is
    /// not older than the minimum supported one. An empty or unparseable
    /// declaration counts as `0.0.0`.
    pub fn is_compatible(&self, declared: &str) -> bool {
        let declared = SemanticVersion::parse_lenient(declared);
        declared.major == self.current.major && declared >= self.min_supported
    }

    /// Concise reason suitable for a report entry.
    pub fn incompatibility_reason(&self, declared: &str) -> String {
        format!(
            "host contract {}, plugin contract {} (min supported {})",
            self.current, declared, self.min_supported
        )
    }
}

impl Default for ContractGate {
    fn default() -> Self {
        Self::host()
    }
}
