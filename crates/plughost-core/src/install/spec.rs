use std::path::Path;

use crate::install::error::InstallError;
use crate::install::resolver::VersionRequest;

/// A parsed `<repo-url>[@<version>|@latest]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    pub url: String,
    /// `Latest` when the argument carried no `@` suffix.
    pub version: VersionRequest,
}

impl InstallSpec {
    /// Splits at the last `@` that comes after the last `/`, so
    /// `git@host:org/repo.git` keeps its user part.
    pub fn parse(spec: &str) -> Result<Self, InstallError> {
        let spec = spec.trim();
        let last_slash = spec.rfind('/');
        let split_at = spec.rfind('@').filter(|at| last_slash.is_none_or(|slash| *at > slash));

        let (url, version) = match split_at {
            Some(at) => {
                let version = &spec[at + 1..];
                if version.is_empty() {
                    return Err(InstallError::invalid_spec(spec, "empty version after '@'"));
                }
                (&spec[..at], version.parse::<VersionRequest>()?)
            }
            None => (spec, VersionRequest::Latest),
        };

        if url.is_empty() {
            return Err(InstallError::invalid_spec(spec, "missing repository url"));
        }
        Ok(Self { url: url.to_string(), version })
    }

    /// Last path segment of the url without a `.git` suffix.
    pub fn default_name(&self) -> Option<String> {
        let trimmed = self.url.trim_end_matches('/');
        let segment = trimmed.rsplit(['/', ':']).next()?;
        let name = segment.strip_suffix(".git").unwrap_or(segment);
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// Name for an extension installed from a local directory: the lowercased
/// directory name without its extension.
pub fn name_from_dir(dir: &Path) -> Option<String> {
    let stem = dir.file_stem()?.to_string_lossy().to_lowercase();
    (!stem.is_empty()).then_some(stem)
}
