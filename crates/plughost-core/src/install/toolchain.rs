use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::install::error::ToolchainError;
use crate::kernel::constants;
use crate::plugin_system::loader::has_loader_extension;

/// Builds extension sources into artifacts and runs their own tests.
#[async_trait]
pub trait BuildToolchain: Send + Sync {
    /// Builds `source` and places the artifact at `output`.
    async fn build(&self, source: &Path, output: &Path) -> Result<PathBuf, ToolchainError>;

    /// Runs the extension's test suite and returns its combined output.
    ///
    /// Callers bound the run themselves; the child process is killed when
    /// the returned future is dropped.
    async fn test(&self, source: &Path) -> Result<String, ToolchainError>;
}

/// [`BuildToolchain`] backed by `cargo`.
#[derive(Debug, Clone)]
pub struct CargoToolchain {
    program: PathBuf,
    build_timeout: Duration,
}

impl Default for CargoToolchain {
    fn default() -> Self {
        Self::new(Duration::from_secs(constants::DEFAULT_BUILD_TIMEOUT_SECS))
    }
}

#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    #[serde(default)]
    manifest_path: Option<PathBuf>,
    #[serde(default)]
    target: Option<CargoTarget>,
    #[serde(default)]
    filenames: Vec<PathBuf>,
    #[serde(default)]
    message: Option<CompilerDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct CargoTarget {
    #[serde(default)]
    kind: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompilerDiagnostic {
    #[serde(default)]
    rendered: Option<String>,
}

/// What a `--message-format=json` build printed, reduced to what we use.
#[derive(Debug, Default)]
pub(crate) struct BuildMessages {
    /// `(manifest_path, artifact)` for every cdylib produced, in order
    pub(crate) cdylibs: Vec<(Option<PathBuf>, PathBuf)>,
    pub(crate) diagnostics: Vec<String>,
}

impl BuildMessages {
    pub(crate) fn parse(stdout: &str) -> Self {
        let mut messages = BuildMessages::default();
        for line in stdout.lines() {
            let Ok(message) = serde_json::from_str::<CargoMessage>(line) else {
                continue;
            };
            match message.reason.as_str() {
                "compiler-artifact" => {
                    let is_cdylib = message
                        .target
                        .as_ref()
                        .is_some_and(|t| t.kind.iter().any(|k| k == "cdylib"));
                    if !is_cdylib {
                        continue;
                    }
                    let library = message
                        .filenames
                        .iter()
                        .find(|f| has_loader_extension(f));
                    if let Some(library) = library {
                        messages.cdylibs.push((message.manifest_path.clone(), library.clone()));
                    }
                }
                "compiler-message" => {
                    if let Some(rendered) = message.message.and_then(|m| m.rendered) {
                        messages.diagnostics.push(rendered);
                    }
                }
                _ => {}
            }
        }
        messages
    }

    /// The cdylib built for `manifest`, or the last one built.
    pub(crate) fn artifact_for(&self, manifest: &Path) -> Option<&Path> {
        self.cdylibs
            .iter()
            .rev()
            .find(|(path, _)| path.as_deref() == Some(manifest))
            .or_else(|| self.cdylibs.last())
            .map(|(_, artifact)| artifact.as_path())
    }
}

impl CargoToolchain {
    pub fn new(build_timeout: Duration) -> Self {
        Self { program: PathBuf::from("cargo"), build_timeout }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, source: &Path, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl BuildToolchain for CargoToolchain {
    async fn build(&self, source: &Path, output: &Path) -> Result<PathBuf, ToolchainError> {
        let manifest = source.join("Cargo.toml");
        if !manifest.is_file() {
            return Err(ToolchainError::MissingManifest(source.to_path_buf()));
        }

        let display = "cargo build --release --lib --message-format=json".to_string();
        log::info!("Building extension in {}", source.display());
        let child = self
            .command(source, &["build", "--release", "--lib", "--message-format=json"])
            .spawn()
            .map_err(|source| ToolchainError::Spawn { command: display.clone(), source })?;

        let result = tokio::time::timeout(self.build_timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolchainError::TimedOut {
                command: display.clone(),
                timeout: self.build_timeout,
            })?
            .map_err(|source| ToolchainError::Spawn { command: display.clone(), source })?;

        let stdout = String::from_utf8_lossy(&result.stdout);
        let messages = BuildMessages::parse(&stdout);
        if !result.status.success() {
            let mut output_text = messages.diagnostics.join("");
            output_text.push_str(String::from_utf8_lossy(&result.stderr).trim());
            return Err(ToolchainError::Failed { command: display, output: output_text });
        }

        let canonical_manifest = tokio::fs::canonicalize(&manifest).await.unwrap_or(manifest);
        let built = messages
            .artifact_for(&canonical_manifest)
            .ok_or_else(|| ToolchainError::ArtifactNotFound(source.to_path_buf()))?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolchainError::io(e, "create_dir_all", parent.to_path_buf()))?;
        }
        tokio::fs::copy(built, output)
            .await
            .map_err(|e| ToolchainError::io(e, "copy_artifact", output.to_path_buf()))?;
        log::info!("Built {} -> {}", built.display(), output.display());
        Ok(output.to_path_buf())
    }

    async fn test(&self, source: &Path) -> Result<String, ToolchainError> {
        let display = "cargo test".to_string();
        let result = self
            .command(source, &["test"])
            .output()
            .await
            .map_err(|source| ToolchainError::Spawn { command: display.clone(), source })?;

        let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&result.stderr));
        let combined = combined.trim().to_string();
        if result.status.success() {
            Ok(combined)
        } else {
            Err(ToolchainError::Failed { command: display, output: combined })
        }
    }
}
