use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::plugin_system::loader::{Artifact, has_loader_extension};

/// Where to look for artifacts. Sources are consulted in field order and
/// the first one that yields anything is used on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySources {
    /// Explicit artifact files
    pub files: Vec<PathBuf>,
    /// Directories whose immediate artifact files are tested
    pub search_dirs: Vec<PathBuf>,
    /// Fallback directory, optionally narrowed by `name_filter`
    pub build_dir: Option<PathBuf>,
    /// Case-insensitive logical name to select from `build_dir`
    pub name_filter: Option<String>,
}

/// Enumerates, sorts and deduplicates the artifacts to test.
pub fn discover(sources: &DiscoverySources) -> Vec<Artifact> {
    let candidates = gather(sources);
    let artifacts = dedupe_by_logical_name(candidates);
    if artifacts.is_empty() {
        log::warn!("No plugins found to test");
    }
    artifacts
}

fn gather(sources: &DiscoverySources) -> Vec<PathBuf> {
    let explicit: Vec<PathBuf> = sources
        .files
        .iter()
        .filter(|f| !f.as_os_str().is_empty() && has_loader_extension(f))
        .filter_map(|f| absolute(f))
        .filter(|f| f.is_file())
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    let searched: Vec<PathBuf> = sources
        .search_dirs
        .iter()
        .filter(|d| !d.as_os_str().is_empty())
        .filter_map(|d| absolute(d))
        .flat_map(|d| list_artifacts(&d))
        .collect();
    if !searched.is_empty() {
        return searched;
    }

    let Some(build_dir) = &sources.build_dir else {
        return Vec::new();
    };
    list_artifacts(build_dir)
        .into_iter()
        .filter(|path| match &sources.name_filter {
            Some(name) if !name.is_empty() => Artifact::from_path(path.clone())
                .is_some_and(|artifact| artifact.logical_name.eq_ignore_ascii_case(name)),
            _ => true,
        })
        .collect()
}

/// Sorts by path and keeps the first artifact per logical name.
pub fn dedupe_by_logical_name(mut paths: Vec<PathBuf>) -> Vec<Artifact> {
    paths.sort();
    paths.dedup();
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter_map(Artifact::from_path)
        .filter(|artifact| {
            let first = seen.insert(artifact.logical_name.clone());
            if !first {
                log::debug!("Skipping duplicate artifact {}", artifact.path.display());
            }
            first
        })
        .collect()
}

/// Artifact files directly inside `dir`.
fn list_artifacts(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| has_loader_extension(path) && path.is_file())
        .collect()
}

fn absolute(path: &Path) -> Option<PathBuf> {
    match std::path::absolute(path) {
        Ok(abs) => Some(abs),
        Err(e) => {
            log::warn!("Cannot resolve {}: {}", path.display(), e);
            None
        }
    }
}
