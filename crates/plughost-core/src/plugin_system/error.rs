//! # plughost Plugin System Errors
//!
//! Defines [`PluginSystemError`], covering failures while opening an
//! artifact, calling across the FFI boundary, and reading metadata.
//! Failures of individual capabilities are not errors at this level; they
//! are recorded as outcomes by the harness.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin loading failed for '{plugin_id}': {source}")]
    LoadingError {
        plugin_id: String,
        path: Option<PathBuf>,
        #[source]
        source: Box<PluginSystemErrorSource>,
    },

    #[error("FFI error in plugin '{plugin_id}' during operation '{operation}': {message}")]
    FfiError {
        plugin_id: String,
        operation: String,
        message: String,
    },

    #[error("Metadata unavailable for '{plugin_id}': {message}")]
    MetadataError {
        plugin_id: String,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemErrorSource {
    #[error(transparent)]
    Library(#[from] libloading::Error),
    #[error("{0}")]
    Other(String),
}

impl PluginSystemError {
    pub(crate) fn loading(
        plugin_id: &str,
        path: &std::path::Path,
        source: PluginSystemErrorSource,
    ) -> Self {
        PluginSystemError::LoadingError {
            plugin_id: plugin_id.to_string(),
            path: Some(path.to_path_buf()),
            source: Box::new(source),
        }
    }
}
