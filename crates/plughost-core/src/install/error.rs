//! # plughost Install Errors
//!
//! Error types for turning a repository reference into a built artifact:
//! version resolution, version control, the build toolchain and the install
//! flow that ties them together.
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::plugin_system::version::{SemanticVersion, VersionError};
use crate::storage::error::StorageSystemError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no semantic version tags found")]
    NoTagsFound,

    #[error("version {0} not found")]
    VersionNotFound(SemanticVersion),
}

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from '{command}': {message}")]
    InvalidOutput { command: String, message: String },
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("'{0}' is not an extension crate: Cargo.toml not found")]
    MissingManifest(PathBuf),

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed:\n{output}")]
    Failed { command: String, output: String },

    #[error("'{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("build of '{0}' produced no cdylib artifact")]
    ArtifactNotFound(PathBuf),

    #[error("I/O error during '{operation}' on '{path}': {source}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolchainError {
    pub(crate) fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ToolchainError::Io { operation: operation.into(), path, source }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid install spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("invalid version request: {0}")]
    Version(#[from] VersionError),

    #[error("version resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("version control error: {0}")]
    Vcs(#[from] VcsError),

    #[error("build toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageSystemError),

    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

impl InstallError {
    pub(crate) fn invalid_spec(spec: &str, reason: impl Into<String>) -> Self {
        InstallError::InvalidSpec { spec: spec.to_string(), reason: reason.into() }
    }
}
