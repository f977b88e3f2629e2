//! # plughost Storage
//!
//! On-disk concerns of the host: the directory layout under the base
//! directory ([`layout`]), host settings files ([`config`]) and the
//! associated error type ([`error`]).
pub mod config;
pub mod error;
pub mod layout;

pub use config::{ConfigFormat, HostSettings};
pub use error::StorageSystemError;
pub use layout::PluginLayout;

#[cfg(test)]
mod tests;
