// SPDX-License-Identifier: MIT

//! The artifact index: a flat, content-addressed directory consulted
//! read-only to decide whether a job's output already exists.

use std::path::{Path, PathBuf};

/// Default location, relative to the working directory the scheduler
/// process was started in.
pub const DEFAULT_ARTIFACT_DIR: &str = "docs/code_runtime/artifacts/by-hash";

/// Handle to the artifact directory. Cheap to clone; holds only a path.
#[derive(Debug, Clone)]
pub struct ArtifactIndex {
    dir: PathBuf,
}

impl ArtifactIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_location() -> Self {
        Self::new(DEFAULT_ARTIFACT_DIR)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True iff some file in the directory has `stem` as its file stem.
    /// The directory may legitimately not exist — that is "no artifacts",
    /// not an error.
    pub fn contains(&self, stem: &str) -> bool {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return false,
        };
        entries
            .filter_map(Result::ok)
            .any(|entry| entry.path().file_stem().and_then(|s| s.to_str()) == Some(stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_means_no_artifacts() {
        let index = ArtifactIndex::new("/nonexistent/path/for/sure/by-hash");
        assert!(!index.contains("abc123"));
    }

    #[test]
    fn finds_file_by_stem_regardless_of_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("abc123.patch"), b"data").expect("write");
        let index = ArtifactIndex::new(dir.path());
        assert!(index.contains("abc123"));
        assert!(!index.contains("def456"));
    }

    #[test]
    fn extensionless_file_matches_by_full_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("abc123"), b"data").expect("write");
        let index = ArtifactIndex::new(dir.path());
        assert!(index.contains("abc123"));
    }
}
