//! # plughost Plugin System
//!
//! Everything needed to open a compiled extension and exercise it against
//! the host's capability contract.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`abi`]**: The C-compatible surface artifacts export, for both the
//!   typed table and the legacy per-capability symbols.
//! - **[`capabilities`]**: The [`Capability`] set and the
//!   [`PluginCapabilities`] trait both artifact shapes are adapted to.
//! - **[`contract`]**: [`ContractGate`], the host/extension contract
//!   compatibility check.
//! - **[`dispatcher`]**: [`CapabilityDispatcher`], which runs the capability
//!   protocol in canonical order under the harness's timeout invoker.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError) for
//!   loading, FFI and metadata failures.
//! - **[`loader`]**: [`LibraryLoader`], which opens artifacts with
//!   `libloading` and picks the matching adapter.
//! - **[`models`]**: Metadata, credentials, query parameters and reply
//!   shapes exchanged with extensions.
//! - **[`version`]**: [`SemanticVersion`] parsing and ordering.
pub mod abi;
pub mod capabilities;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod models;
pub mod version;

pub use capabilities::{Availability, Capability, CapabilityError, DispatchTier, PluginCapabilities};
pub use contract::ContractGate;
pub use dispatcher::{CapabilityDispatcher, DispatchInputs, DispatchOutcome};
pub use error::PluginSystemError;
pub use loader::{Artifact, ArtifactLoader, LibraryLoader, read_metadata};
pub use models::PluginMetadata;
pub use version::{SemanticVersion, VersionError};
