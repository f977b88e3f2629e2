use std::fmt;
use std::str::FromStr;

use crate::install::error::ResolutionError;
use crate::plugin_system::version::{SemanticVersion, VersionError};

/// Which release of a repository to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionRequest {
    #[default]
    Latest,
    Exact(SemanticVersion),
}

impl FromStr for VersionRequest {
    type Err = VersionError;

    /// `"latest"` in any case, otherwise a strict `MAJOR.MINOR.PATCH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(VersionRequest::Latest);
        }
        SemanticVersion::parse(s).map(VersionRequest::Exact)
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Latest => f.write_str("latest"),
            VersionRequest::Exact(version) => write!(f, "{}", version),
        }
    }
}

/// Opaque commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReference {
    pub name: String,
    pub target: Revision,
}

impl TagReference {
    pub fn new(name: impl Into<String>, target: Revision) -> Self {
        Self { name: name.into(), target }
    }
}

/// Picks the tag satisfying `request`.
///
/// Tags that are not strict semantic versions are skipped. Among equal
/// versions the first tag encountered wins, both for the latest candidate
/// and for an exact match.
pub fn resolve<I>(tags: I, request: &VersionRequest) -> Result<TagReference, ResolutionError>
where
    I: IntoIterator<Item = TagReference>,
{
    let mut latest: Option<(SemanticVersion, TagReference)> = None;
    let mut exact: Option<TagReference> = None;

    for tag in tags {
        let version = match SemanticVersion::parse(&tag.name) {
            Ok(version) => version,
            Err(e) => {
                log::debug!("Ignoring tag '{}': {}", tag.name, e);
                continue;
            }
        };

        if let VersionRequest::Exact(wanted) = request {
            if exact.is_none() && version == *wanted {
                exact = Some(tag.clone());
            }
        }

        let is_newer = latest.as_ref().is_none_or(|(best, _)| version > *best);
        if is_newer {
            latest = Some((version, tag));
        }
    }

    match request {
        VersionRequest::Latest => latest.map(|(_, tag)| tag).ok_or(ResolutionError::NoTagsFound),
        VersionRequest::Exact(wanted) => exact.ok_or(ResolutionError::VersionNotFound(*wanted)),
    }
}
