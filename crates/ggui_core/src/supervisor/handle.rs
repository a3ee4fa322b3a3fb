//! Handle for one visualization run (and its optional encoder).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::process::SupervisedChild;
use crate::models::RunStatus;

/// One spawned visualization, optionally piped into an encoder.
///
/// The children are alive exactly while `status()` is `Running`. Dropping a
/// running handle kills and reaps them.
pub struct RunHandle {
    pub(crate) producer: SupervisedChild,
    pub(crate) encoder: Option<SupervisedChild>,
    pub(crate) status: RunStatus,
    pub(crate) output_path: Option<PathBuf>,
    started_at: DateTime<Local>,
}

impl RunHandle {
    pub(crate) fn new(
        producer: SupervisedChild,
        encoder: Option<SupervisedChild>,
        output_path: Option<PathBuf>,
    ) -> Self {
        Self {
            producer,
            encoder,
            status: RunStatus::Running,
            output_path,
            started_at: Local::now(),
        }
    }

    /// Last observed status (call `Supervisor::poll` to refresh).
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether this run feeds an encoder.
    pub fn is_export(&self) -> bool {
        self.encoder.is_some()
    }

    /// Process id of the visualization.
    pub fn pid(&self) -> u32 {
        self.producer.pid()
    }

    /// Arguments the visualization was started with.
    pub fn args(&self) -> &[String] {
        self.producer.args()
    }

    pub fn encoder_pid(&self) -> Option<u32> {
        self.encoder.as_ref().map(SupervisedChild::pid)
    }

    pub fn encoder_args(&self) -> Option<&[String]> {
        self.encoder.as_ref().map(SupervisedChild::args)
    }

    /// Export target, for export runs.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Last `time=` position reported by the encoder.
    pub fn export_progress(&self) -> Option<String> {
        self.encoder.as_ref().and_then(|e| e.log().progress())
    }

    /// Recent stderr lines of the visualization.
    pub fn stderr_tail(&self) -> Vec<String> {
        self.producer.log().tail()
    }

    /// Recent stderr lines of the encoder.
    pub fn encoder_stderr_tail(&self) -> Vec<String> {
        self.encoder
            .as_ref()
            .map(|e| e.log().tail())
            .unwrap_or_default()
    }

    /// Run log files written for this run.
    pub fn log_paths(&self) -> Vec<PathBuf> {
        std::iter::once(&self.producer)
            .chain(self.encoder.as_ref())
            .filter_map(|c| c.log().log_path().map(Path::to_path_buf))
            .collect()
    }

    /// Kill and reap whatever is still alive.
    pub(crate) fn kill_all(&mut self) {
        self.producer.kill_and_reap();
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.kill_and_reap();
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        tracing::warn!("Run handle for pid {} dropped while running, killing", self.pid());
        self.kill_all();
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("pid", &self.pid())
            .field("encoder_pid", &self.encoder_pid())
            .field("status", &self.status)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}
