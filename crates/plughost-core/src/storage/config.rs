use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::harness::runner::TestMode;
use crate::kernel::constants;
use crate::plugin_system::models::{ContactQueryParams, Credentials, LedgerQueryParams};
use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Formats compiled into this build, in lookup order
    pub fn available() -> Vec<ConfigFormat> {
        vec![
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml,
            ConfigFormat::Json,
        ]
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Host-wide defaults read from the settings file. CLI flags override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub call_timeout_secs: u64,
    /// Overall bound on a harness run; unbounded when absent
    pub run_timeout_secs: Option<u64>,
    pub source_test_timeout_secs: u64,
    pub build_timeout_secs: u64,
    pub mode: TestMode,
    /// Overrides `<base>/plugins/build` as the fallback artifact directory
    pub build_dir: Option<PathBuf>,
    pub credentials: Credentials,
    pub contact_params: ContactQueryParams,
    pub ledger_params: LedgerQueryParams,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            call_timeout_secs: constants::DEFAULT_CALL_TIMEOUT_SECS,
            run_timeout_secs: None,
            source_test_timeout_secs: constants::DEFAULT_SOURCE_TEST_TIMEOUT_SECS,
            build_timeout_secs: constants::DEFAULT_BUILD_TIMEOUT_SECS,
            mode: TestMode::default(),
            build_dir: None,
            credentials: Credentials::new(),
            contact_params: ContactQueryParams::default(),
            ledger_params: LedgerQueryParams::default(),
        }
    }
}

impl HostSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn source_test_timeout(&self) -> Duration {
        Duration::from_secs(self.source_test_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self, StorageSystemError> {
        let deser_err = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::DeserializationError {
                format: format.extension().to_string(),
                source,
            }
        };
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| deser_err(Box::new(e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| deser_err(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| deser_err(Box::new(e))),
        }
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, StorageSystemError> {
        let ser_err = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::SerializationError {
                format: format.extension().to_string(),
                source,
            }
        };
        match format {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).map_err(|e| ser_err(Box::new(e)))
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| ser_err(Box::new(e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ser_err(Box::new(e))),
        }
    }

    /// Loads a settings file, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, StorageSystemError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            StorageSystemError::UnsupportedConfigFormat(path.display().to_string())
        })?;
        let data = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageSystemError::FileNotFound(path.to_path_buf())
            } else {
                StorageSystemError::io(e, "read_settings", path.to_path_buf())
            }
        })?;
        log::debug!("Loading settings from {}", path.display());
        Self::deserialize(&data, format)
    }

    /// First `config.<ext>` inside `base_dir`, trying each compiled format.
    pub fn find_in(base_dir: &Path) -> Option<PathBuf> {
        ConfigFormat::available()
            .into_iter()
            .map(|format| {
                base_dir.join(format!("{}.{}", constants::SETTINGS_FILE_STEM, format.extension()))
            })
            .find(|candidate| candidate.is_file())
    }

    /// Loads `explicit` when given, otherwise the settings file found in
    /// `base_dir`, otherwise the defaults.
    pub fn resolve(explicit: Option<&Path>, base_dir: &Path) -> Result<Self, StorageSystemError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::find_in(base_dir) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }
}
