//! # plughost Kernel
//!
//! Process-wide constants (application identity, contract versions, default
//! timeouts and directory names) and the crate-wide error type.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
