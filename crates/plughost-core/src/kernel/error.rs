//! # plughost Kernel Errors
//!
//! Defines the crate-wide [`Error`] type. Each subsystem keeps its own typed
//! error enum; this type aggregates them so callers at the binary boundary
//! can use a single `Result` alias.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::install::error::InstallError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;

/// Crate-wide error type
#[derive(Debug, ThisError)]
pub enum Error {
    /// Loading, probing or reading metadata from an artifact failed
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Resolving, fetching or building an extension failed
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Settings or filesystem layout error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
