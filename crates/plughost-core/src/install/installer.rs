use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::install::error::InstallError;
use crate::install::resolver::{TagReference, resolve};
use crate::install::spec::{InstallSpec, name_from_dir};
use crate::install::toolchain::BuildToolchain;
use crate::install::vcs::VersionControl;
use crate::storage::error::StorageSystemError;
use crate::storage::layout::PluginLayout;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub name: String,
    pub source_dir: PathBuf,
    pub artifact: PathBuf,
    /// The tag that was checked out; `None` for a local directory install.
    pub tag: Option<TagReference>,
}

/// Fetches extension sources, selects a release and builds the artifact
/// into the layout's build directory.
#[derive(Clone)]
pub struct Installer {
    layout: PluginLayout,
    vcs: Arc<dyn VersionControl>,
    toolchain: Arc<dyn BuildToolchain>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer").field("layout", &self.layout).finish_non_exhaustive()
    }
}

impl Installer {
    pub fn new(
        layout: PluginLayout,
        vcs: Arc<dyn VersionControl>,
        toolchain: Arc<dyn BuildToolchain>,
    ) -> Self {
        Self { layout, vcs, toolchain }
    }

    pub fn layout(&self) -> &PluginLayout {
        &self.layout
    }

    /// Clones the repository, checks out the requested release and builds
    /// it.
    ///
    /// The clone is staged beside `pkgs/<name>` and replaces the previous
    /// checkout only after a successful build; on failure the staged clone
    /// is removed and the previous checkout is left as it was.
    pub async fn install_repo(
        &self,
        spec: &InstallSpec,
        name: Option<&str>,
        token: Option<&str>,
    ) -> Result<InstallOutcome, InstallError> {
        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => spec.default_name().ok_or_else(|| {
                InstallError::invalid_spec(&spec.url, "cannot derive an extension name")
            })?,
        };

        self.layout.ensure().await?;
        let staging_dir = self.layout.staging_dir(&name);
        remove_dir_if_present(&staging_dir).await?;

        let (tag, artifact) = match self.fetch_and_build(spec, &name, &staging_dir, token).await {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_present(&staging_dir).await {
                    log::warn!("Could not remove {}: {}", staging_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        let source_dir = self.layout.package_dir(&name);
        if tokio::fs::try_exists(&source_dir).await.unwrap_or(false) {
            log::info!("Replacing previous checkout at {}", source_dir.display());
        }
        remove_dir_if_present(&source_dir).await?;
        tokio::fs::rename(&staging_dir, &source_dir)
            .await
            .map_err(|e| StorageSystemError::io(e, "rename", staging_dir.clone()))?;
        Ok(InstallOutcome { name, source_dir, artifact, tag: Some(tag) })
    }

    /// Builds an extension from a local source directory.
    pub async fn install_dir(
        &self,
        dir: &Path,
        name: Option<&str>,
    ) -> Result<InstallOutcome, InstallError> {
        let source_dir = tokio::fs::canonicalize(dir)
            .await
            .map_err(|_| InstallError::SourceNotFound(dir.to_path_buf()))?;
        if !source_dir.is_dir() {
            return Err(InstallError::SourceNotFound(source_dir));
        }

        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => name_from_dir(&source_dir).ok_or_else(|| {
                let dir = source_dir.display().to_string();
                InstallError::invalid_spec(&dir, "cannot derive an extension name")
            })?,
        };

        self.layout.ensure().await?;
        log::info!("Installing extension '{}' from directory {}", name, source_dir.display());
        let artifact = self.build(&name, &source_dir).await?;
        Ok(InstallOutcome { name, source_dir, artifact, tag: None })
    }

    async fn fetch_and_build(
        &self,
        spec: &InstallSpec,
        name: &str,
        checkout: &Path,
        token: Option<&str>,
    ) -> Result<(TagReference, PathBuf), InstallError> {
        log::info!("Cloning {} into {}", spec.url, checkout.display());
        self.vcs.clone_repo(&spec.url, checkout, token).await?;

        let tags = self.vcs.list_tags(checkout).await?;
        let tag = resolve(tags, &spec.version)?;
        log::info!("Checking out {} ({})", tag.name, tag.target);
        self.vcs.checkout(checkout, &tag.target).await?;

        let artifact = self.build(name, checkout).await?;
        Ok((tag, artifact))
    }

    async fn build(&self, name: &str, source_dir: &Path) -> Result<PathBuf, InstallError> {
        let output = self.layout.artifact_path(name);
        let artifact = self.toolchain.build(source_dir, &output).await?;
        log::info!("Extension '{}' installed at {}", name, artifact.display());
        Ok(artifact)
    }
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), StorageSystemError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageSystemError::io(e, "remove_dir_all", dir.to_path_buf())),
    }
}
