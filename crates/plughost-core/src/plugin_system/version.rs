use std::cmp::Ordering;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use thiserror::Error;

/// Error type for version parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version format: expected MAJOR.MINOR.PATCH, found {found} segment(s)")]
    SegmentCount { found: usize },

    #[error("Invalid {segment} segment '{value}': not a non-negative integer")]
    InvalidSegment { segment: &'static str, value: String },
}

/// A `MAJOR.MINOR.PATCH` release version.
///
/// Ordering is lexicographic over the triple, which is exactly the derived
/// `Ord` given the field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    /// Creates a new version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a version string like "1.2.3" or "v1.2.3".
    ///
    /// Anything other than exactly three numeric segments is rejected; a
    /// pre-release suffix makes the last segment non-numeric and therefore
    /// invalid here.
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let stripped = version.strip_prefix('v').unwrap_or(version);
        let parts: Vec<&str> = stripped.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::SegmentCount { found: parts.len() });
        }

        let parse_part = |segment: &'static str, part: &str| -> Result<u64, VersionError> {
            // u64::from_str accepts a leading '+', a release segment must not.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::InvalidSegment { segment, value: part.to_string() });
            }
            part.parse::<u64>()
                .map_err(|_| VersionError::InvalidSegment { segment, value: part.to_string() })
        };

        let major = parse_part("major", parts[0])?;
        let minor = parse_part("minor", parts[1])?;
        let patch = parse_part("patch", parts[2])?;

        Ok(Self::new(major, minor, patch))
    }

    /// Parses a declared contract version.
    ///
    /// Whitespace is trimmed and everything from the first `-` or `+` is
    /// dropped. Missing segments count as 0, and so does any segment that is
    /// not a plain number; segments past the third are ignored.
    pub fn parse_lenient(version: &str) -> Self {
        let trimmed = version.trim();
        let core = match trimmed.find(['-', '+']) {
            Some(end) => &trimmed[..end],
            None => trimmed,
        };
        let mut segments = core.split('.').map(lenient_segment);
        let mut next = || segments.next().unwrap_or(0);
        let (major, minor, patch) = (next(), next(), next());
        let parsed = Self::new(major, minor, patch);
        if !trimmed.is_empty() && parsed == Self::default() {
            log::debug!("Contract version '{}' reads as 0.0.0", version);
        }
        parsed
    }

    /// Compares major, then minor, then patch.
    pub fn compare(&self, other: &SemanticVersion) -> Ordering {
        self.cmp(other)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemanticVersion::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Out-of-range numbers saturate; anything else that is not a number is 0.
fn lenient_segment(part: &str) -> u64 {
    match part.parse::<u64>() {
        Ok(value) => value,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u64::MAX,
        Err(_) => 0,
    }
}
