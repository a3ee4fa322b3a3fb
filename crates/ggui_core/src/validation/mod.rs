//! Repository validation.
//!
//! Classifies a directory by the version-control metadata it contains and
//! summarizes its history with the matching command-line tool:
//!
//! - **detect**: marker lookup (`.git`, `.hg`, `.svn`, `.bzr`, `CVS`) with a
//!   `git rev-parse` fallback
//! - **metadata**: commit count, contributors and dates per VCS
//! - **languages**: source language shares and common file extensions
//! - **runner**: the `CommandRunner` seam used for every tool call
//!
//! Tool failures degrade the summary (see `RepositoryInfo::warnings`) and
//! never fail validation.

mod detect;
mod languages;
mod metadata;
mod runner;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use languages::{language_for, language_shares, scan_sources, SourceScan, TOP_EXTENSION_COUNT};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

use crate::config::ToolSettings;
use crate::models::RepositoryInfo;

/// Errors raised while validating a repository path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("Invalid repository path '{}': {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },
}

impl ValidateError {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for validation.
pub type ValidateResult<T> = Result<T, ValidateError>;

/// Checks candidate repository directories.
#[derive(Debug, Clone)]
pub struct RepositoryValidator<R: CommandRunner = SystemRunner> {
    runner: R,
    git: String,
}

impl RepositoryValidator<SystemRunner> {
    /// Validator that runs the real VCS tools found on PATH.
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }

    /// Validator honouring an explicitly configured git executable.
    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self::new().git_executable(tools.git())
    }
}

impl Default for RepositoryValidator<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> RepositoryValidator<R> {
    /// Validator using a custom command runner.
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            git: "git".to_string(),
        }
    }

    /// Use a specific git executable.
    pub fn git_executable(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Validate `path` and summarize the repository it contains.
    ///
    /// Fails only when `path` does not exist or is not a directory. A
    /// directory without VCS metadata yields `VcsKind::Invalid`.
    pub fn validate(&self, path: &Path) -> ValidateResult<RepositoryInfo> {
        if !path.exists() {
            return Err(ValidateError::invalid_path(path, "path does not exist"));
        }
        if !path.is_dir() {
            return Err(ValidateError::invalid_path(path, "path is not a directory"));
        }
        let root = path
            .canonicalize()
            .map_err(|e| ValidateError::invalid_path(path, e.to_string()))?;

        let kind = detect::detect_kind(&root, &self.runner, &self.git);
        let mut info = RepositoryInfo::new(root, kind);
        if !kind.is_valid() {
            tracing::info!("No supported version control found in {}", info.path.display());
            return Ok(info);
        }

        metadata::collect(&self.runner, &self.git, &mut info);
        let scan = scan_sources(&info.path);
        info.languages = scan.languages;
        info.top_extensions = scan.top_extensions;

        tracing::info!(
            "Validated {} repository {} ({} commits, {} contributors)",
            info.kind,
            info.path.display(),
            info.commit_count,
            info.contributor_count()
        );
        Ok(info)
    }
}

/// Validate `path` with the system tools.
pub fn validate(path: &Path) -> ValidateResult<RepositoryInfo> {
    RepositoryValidator::new().validate(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VcsKind;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use tempfile::tempdir;

    /// Answers known command lines; anything else is "not found".
    #[derive(Default)]
    struct FakeRunner {
        responses: HashMap<String, CommandOutput>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn respond(mut self, command: &str, stdout: &str) -> Self {
            self.responses.insert(
                command.to_string(),
                CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    success: true,
                },
            );
            self
        }

        fn fail(mut self, command: &str, stderr: &str) -> Self {
            self.responses.insert(
                command.to_string(),
                CommandOutput {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    success: false,
                },
            );
            self
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> io::Result<CommandOutput> {
            let key = format!("{} {}", program, args.join(" "));
            self.calls.borrow_mut().push(key.clone());
            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not installed"))
        }
    }

    fn git_runner() -> FakeRunner {
        FakeRunner::default()
            .respond("git rev-list --count HEAD", "42\n")
            .respond("git log --format=%an --all", "Alice\nBob\nAlice\n\n")
            .respond(
                "git log --format=%cs --reverse --all",
                "2019-05-01\n2020-01-01\n2023-11-30\n",
            )
    }

    #[test]
    fn git_marker_validates_as_git() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("main.rs"), "").unwrap();

        let info = RepositoryValidator::with_runner(git_runner())
            .validate(dir.path())
            .unwrap();

        assert_eq!(info.kind, VcsKind::Git);
        assert!(info.path.is_absolute());
        assert_eq!(info.commit_count, 42);
        assert_eq!(info.contributor_count(), 2);
        assert_eq!(
            info.date_range,
            Some((
                NaiveDate::from_ymd_opt(2019, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 11, 30).unwrap()
            ))
        );
        assert_eq!(info.languages.get("Rust"), Some(&1.0));
        assert_eq!(info.top_extensions, vec!["rs"]);
        assert!(!info.is_partial());
    }

    #[test]
    fn git_file_marker_counts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".git"), "gitdir: ../.git/worktrees/x\n").unwrap();

        let info = RepositoryValidator::with_runner(git_runner())
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Git);
    }

    #[test]
    fn missing_path_is_invalid_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = RepositoryValidator::with_runner(FakeRunner::default())
            .validate(&missing)
            .unwrap_err();
        assert!(matches!(err, ValidateError::InvalidPath { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn file_path_is_invalid_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let err = RepositoryValidator::with_runner(FakeRunner::default())
            .validate(&file)
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn plain_directory_is_invalid_kind() {
        let dir = tempdir().unwrap();
        let runner = FakeRunner::default().fail(
            "git rev-parse --is-inside-work-tree",
            "fatal: not a git repository",
        );

        let info = RepositoryValidator::with_runner(runner)
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Invalid);
        assert!(!info.is_valid());
        assert_eq!(info.commit_count, 0);
    }

    #[test]
    fn missing_git_reports_invalid_without_marker() {
        let dir = tempdir().unwrap();
        let info = RepositoryValidator::with_runner(FakeRunner::default())
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Invalid);
    }

    #[test]
    fn work_tree_fallback_detects_git() {
        let dir = tempdir().unwrap();
        let runner = git_runner().respond("git rev-parse --is-inside-work-tree", "true\n");

        let info = RepositoryValidator::with_runner(runner)
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Git);
    }

    #[test]
    fn marker_precedence_prefers_git() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".svn")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let info = RepositoryValidator::with_runner(git_runner())
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Git);
    }

    #[test]
    fn failing_tool_degrades_to_warnings() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let runner = FakeRunner::default()
            .fail(
                "git rev-list --count HEAD",
                "fatal: ambiguous argument 'HEAD'",
            )
            .respond("git log --format=%an --all", "");

        let info = RepositoryValidator::with_runner(runner)
            .validate(dir.path())
            .unwrap();

        assert_eq!(info.kind, VcsKind::Git);
        assert_eq!(info.commit_count, 0);
        assert!(info.contributors.is_empty());
        assert_eq!(info.warnings.len(), 2);
        assert!(info.warnings[0].contains("ambiguous argument"));
        assert!(info.warnings[1].contains("could not run git"));
    }

    #[test]
    fn missing_hg_keeps_kind() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".hg")).unwrap();

        let info = RepositoryValidator::with_runner(FakeRunner::default())
            .validate(dir.path())
            .unwrap();
        assert_eq!(info.kind, VcsKind::Mercurial);
        assert!(info.is_partial());
    }

    #[test]
    fn configured_git_executable_is_used() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let validator =
            RepositoryValidator::with_runner(FakeRunner::default()).git_executable("/opt/git/bin/git");
        validator.validate(dir.path()).unwrap();

        let calls = validator.runner.calls.borrow();
        assert!(calls.iter().all(|c| c.starts_with("/opt/git/bin/git ")));
        assert_eq!(calls.len(), 3);
    }
}
