//! # plughost-core
//!
//! Library side of `plughost`: selecting a tagged release of an extension's
//! source, building it into a loadable artifact, and exercising compiled
//! artifacts against the host's capability contract.
pub mod harness;
pub mod install;
pub mod kernel;
pub mod plugin_system;
pub mod storage;

pub use kernel::error::{Error, Result};
pub use plugin_system::{
    Capability, CapabilityDispatcher, ContractGate, LibraryLoader, PluginCapabilities,
    PluginMetadata, SemanticVersion,
};
pub use harness::{HarnessRunner, RunConfig, RunResult, TestMode};
pub use install::{Installer, VersionRequest};
