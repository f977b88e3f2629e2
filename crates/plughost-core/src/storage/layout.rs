use std::env;
use std::path::{Path, PathBuf};

use crate::kernel::constants;
use crate::storage::error::StorageSystemError;

/// Directory layout under the host's base directory.
///
/// ```text
/// <base>/
///   config.{toml,yaml,json}
///   plugins/
///     build/<name>.<dll-ext>
///     pkgs/<name>/
///     pkgs/.<name>.staging/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLayout {
    base: PathBuf,
}

impl PluginLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `~/.plughost`, or `./.plughost` when `debug` is set.
    pub fn resolve(debug: bool) -> Result<Self, StorageSystemError> {
        let root = if debug { current_dir()? } else { home_dir()? };
        Ok(Self::new(root.join(constants::BASE_DIR_NAME)))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.base.join(constants::PLUGINS_DIR)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.plugins_dir().join(constants::BUILD_DIR)
    }

    pub fn pkgs_dir(&self) -> PathBuf {
        self.plugins_dir().join(constants::PKGS_DIR)
    }

    /// Checked-out source of the named extension
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.pkgs_dir().join(name)
    }

    /// Scratch checkout used while installing; replaces
    /// [`package_dir`](Self::package_dir) once the build succeeds.
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.pkgs_dir().join(format!(".{}.staging", name))
    }

    /// Where the named extension's artifact is built to
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.build_dir().join(format!("{}.{}", name, env::consts::DLL_EXTENSION))
    }

    /// Creates the build and pkgs directories.
    pub async fn ensure(&self) -> Result<(), StorageSystemError> {
        for dir in [self.build_dir(), self.pkgs_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", dir.clone()))?;
        }
        Ok(())
    }
}

fn current_dir() -> Result<PathBuf, StorageSystemError> {
    env::current_dir().map_err(|e| StorageSystemError::io(e, "current_dir", PathBuf::from(".")))
}

fn home_dir() -> Result<PathBuf, StorageSystemError> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| StorageSystemError::PathResolutionFailed {
            path: PathBuf::from("~"),
            reason: "neither HOME nor USERPROFILE is set".to_string(),
        })
}
