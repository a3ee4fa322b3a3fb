//! VCS kind detection.

use std::path::Path;

use super::runner::CommandRunner;
use crate::models::VcsKind;

/// Classify `path` by its metadata entries, first match wins.
///
/// Without a marker, asks git whether `path` is inside a work tree so that
/// sub-directories of a checkout are still recognized.
pub(crate) fn detect_kind<R: CommandRunner + ?Sized>(path: &Path, runner: &R, git: &str) -> VcsKind {
    for kind in VcsKind::DETECTION_ORDER {
        let Some(marker) = kind.marker() else {
            continue;
        };
        let candidate = path.join(marker);
        let found = match kind {
            // `.git` is a file in worktrees and submodules
            VcsKind::Git => candidate.exists(),
            _ => candidate.is_dir(),
        };
        if found {
            return kind;
        }
    }

    match runner.run(git, &["rev-parse", "--is-inside-work-tree"], path) {
        Ok(output) if output.success && output.stdout.trim() == "true" => VcsKind::Git,
        Ok(_) => VcsKind::Invalid,
        Err(e) => {
            tracing::debug!("git work-tree check unavailable: {}", e);
            VcsKind::Invalid
        }
    }
}
