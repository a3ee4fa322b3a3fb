//! Repository summary produced by the validator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use super::enums::VcsKind;

/// Summary of a checked repository.
///
/// Built fresh on every validation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryInfo {
    /// Absolute path of the checked directory.
    pub path: PathBuf,
    /// Directory name, for display.
    pub name: String,
    /// Detected version-control system.
    pub kind: VcsKind,
    /// Number of commits (0 when unknown).
    pub commit_count: u64,
    /// Distinct author names.
    pub contributors: BTreeSet<String>,
    /// Language name -> share of recognized source files.
    pub languages: BTreeMap<String, f64>,
    /// Most common file extensions (without the dot), most frequent first.
    pub top_extensions: Vec<String>,
    /// First and last commit dates, when the VCS reports them.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Metadata that could not be collected.
    pub warnings: Vec<String>,
}

impl RepositoryInfo {
    /// Create an empty summary for `path`.
    pub fn new(path: impl Into<PathBuf>, kind: VcsKind) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            kind,
            commit_count: 0,
            contributors: BTreeSet::new(),
            languages: BTreeMap::new(),
            top_extensions: Vec::new(),
            date_range: None,
            warnings: Vec::new(),
        }
    }

    /// Repository root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory is a recognized repository.
    pub fn is_valid(&self) -> bool {
        self.kind.is_valid()
    }

    /// Number of distinct contributors.
    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }

    /// Languages ordered by share, largest first.
    pub fn primary_languages(&self, limit: usize) -> Vec<(&str, f64)> {
        let mut langs: Vec<(&str, f64)> = self
            .languages
            .iter()
            .map(|(name, share)| (name.as_str(), *share))
            .collect();
        langs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        langs.truncate(limit);
        langs
    }

    /// Whether any metadata was degraded.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}
