//! Process supervision for gource runs and video exports.
//!
//! A `Supervisor` spawns processes and hands back a `RunHandle`; the caller
//! owns the handle and drives it with `poll`, `stop` or `wait`. There is no
//! global state, so any number of runs may coexist.
//!
//! Export runs connect two children with an OS pipe:
//!
//! ```text
//! gource ... --output-ppm-stream -  |  ffmpeg -f image2pipe -i - ... out.mp4
//! ```
//!
//! Each child's stderr is drained by one reader thread into its `RunLog`.

mod errors;
mod handle;
mod process;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub use errors::{SupervisorError, SupervisorResult};
pub use handle::RunHandle;

use process::SupervisedChild;

use crate::command::{export_stream_args, format_tokens, EncoderOptionsBuilder, FFMPEG_EXECUTABLE};
use crate::config::{LoggingSettings, ToolSettings};
use crate::logging::{LogConfig, RunLog};
use crate::models::{ExportOptions, RunStatus};

/// Shared callback receiving every run log line (e.g. a GUI log view).
pub type SharedLineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Starts and tracks external processes.
#[derive(Clone)]
pub struct Supervisor {
    ffmpeg: String,
    stop_grace: Duration,
    poll_interval: Duration,
    log_config: LogConfig,
    logs_dir: Option<PathBuf>,
    line_callback: Option<SharedLineCallback>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            ffmpeg: FFMPEG_EXECUTABLE.to_string(),
            stop_grace: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            log_config: LogConfig::default(),
            logs_dir: None,
            line_callback: None,
        }
    }

    /// Supervisor configured from the `tools` and `logging` settings.
    pub fn from_settings(tools: &ToolSettings, logging: &LoggingSettings) -> Self {
        Self {
            ffmpeg: tools.ffmpeg().to_string(),
            stop_grace: tools.stop_grace(),
            poll_interval: tools.poll_interval(),
            log_config: logging.run_log_config(),
            logs_dir: None,
            line_callback: None,
        }
    }

    /// Encoder executable for `start_with_export`.
    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// How long a stopped run may take to wind down before it is killed.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    /// Write one log file per child into `dir`.
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    pub fn with_line_callback(mut self, callback: SharedLineCallback) -> Self {
        self.line_callback = Some(callback);
        self
    }

    /// Sleep between polls in `wait`.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stop_grace(&self) -> Duration {
        self.stop_grace
    }

    /// Spawn `args[0]` with the remaining tokens and return immediately.
    pub fn start(&self, args: &[String]) -> SupervisorResult<RunHandle> {
        let log = self.run_log(args)?;
        log.command(&format_tokens(args));

        let producer = SupervisedChild::spawn(args, Stdio::null(), Stdio::null(), log)?;
        tracing::info!("Started {} (pid {})", producer.log().label(), producer.pid());

        Ok(RunHandle::new(producer, None, None))
    }

    /// Spawn the visualization with raw-frame output piped into the encoder.
    pub fn start_with_export(
        &self,
        args: &[String],
        output_path: &Path,
        options: &ExportOptions,
    ) -> SupervisorResult<RunHandle> {
        let encoder_args = EncoderOptionsBuilder::new(options, output_path)
            .executable(&self.ffmpeg)
            .build()?;

        let mut producer_args = args.to_vec();
        producer_args.extend(export_stream_args(options.framerate));

        let mut handle = self.start_pipeline(&producer_args, &encoder_args)?;
        handle.output_path = Some(output_path.to_path_buf());
        Ok(handle)
    }

    /// Spawn `producer_args` with stdout piped into `encoder_args`' stdin.
    ///
    /// If the encoder cannot be spawned the producer is killed and reaped
    /// before the launch error is returned.
    pub fn start_pipeline(
        &self,
        producer_args: &[String],
        encoder_args: &[String],
    ) -> SupervisorResult<RunHandle> {
        if encoder_args.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        let producer_log = self.run_log(producer_args)?;
        producer_log.command(&format_tokens(producer_args));
        let mut producer =
            SupervisedChild::spawn(producer_args, Stdio::null(), Stdio::piped(), producer_log)?;

        let Some(frames) = producer.take_stdout() else {
            producer.kill_and_reap();
            return Err(SupervisorError::Io(std::io::Error::other(
                "producer stdout was not captured",
            )));
        };

        let encoder_log = match self.run_log(encoder_args) {
            Ok(log) => log,
            Err(e) => {
                producer.kill_and_reap();
                return Err(e);
            }
        };
        encoder_log.command(&format_tokens(encoder_args));

        let encoder = match SupervisedChild::spawn(
            encoder_args,
            Stdio::from(frames),
            Stdio::null(),
            encoder_log,
        ) {
            Ok(encoder) => encoder,
            Err(e) => {
                tracing::error!("Encoder failed to start, stopping producer: {}", e);
                producer.kill_and_reap();
                producer.finish_reader();
                return Err(e);
            }
        };

        tracing::info!(
            "Started export pipeline {} (pid {}) -> {} (pid {})",
            producer.log().label(),
            producer.pid(),
            encoder.log().label(),
            encoder.pid()
        );
        Ok(RunHandle::new(producer, Some(encoder), None))
    }

    /// Refresh and return the run status without blocking.
    pub fn poll(&self, handle: &mut RunHandle) -> RunStatus {
        if handle.status.is_terminal() {
            return handle.status.clone();
        }

        let producer_exit = match handle.producer.try_exit() {
            Ok(exit) => exit,
            Err(e) => return self.abort(handle, format!("could not query process: {e}")),
        };

        let status = match handle.encoder.as_mut() {
            None => match producer_exit {
                None => RunStatus::Running,
                Some(_) => {
                    handle.producer.finish_reader();
                    outcome(handle.producer.failure_message())
                }
            },
            Some(encoder) => {
                let encoder_exit = match encoder.try_exit() {
                    Ok(exit) => exit,
                    Err(e) => return self.abort(handle, format!("could not query encoder: {e}")),
                };
                match (producer_exit, encoder_exit) {
                    (Some(_), Some(_)) => {
                        handle.producer.finish_reader();
                        encoder.finish_reader();
                        outcome(
                            encoder
                                .failure_message()
                                .or_else(|| handle.producer.failure_message()),
                        )
                    }
                    (None, Some(status)) if !status.success() => {
                        // Nothing will read the frames any more
                        handle.producer.terminate();
                        RunStatus::Running
                    }
                    _ => RunStatus::Running,
                }
            }
        };

        if status.is_terminal() {
            self.finish(handle, status.clone());
        }
        status
    }

    /// Stop the run and return its terminal status.
    ///
    /// The visualization is signalled first; in export mode the encoder then
    /// gets the grace period to finish the file. Anything still alive after
    /// that is killed. Stopping a finished run is a no-op.
    pub fn stop(&self, handle: &mut RunHandle) -> RunStatus {
        if handle.status.is_terminal() {
            return handle.status.clone();
        }
        tracing::info!("Stopping run (pid {})", handle.pid());

        handle.producer.terminate();
        if handle
            .producer
            .wait_timeout(self.stop_grace, self.poll_interval)
            .is_none()
        {
            tracing::warn!("pid {} ignored SIGTERM, killing", handle.pid());
            handle.producer.log().warn("Ignored SIGTERM, killing");
            handle.producer.kill_and_reap();
        }

        if let Some(encoder) = handle.encoder.as_mut() {
            // The encoder sees end of input once the producer is gone
            if encoder
                .wait_timeout(self.stop_grace, self.poll_interval)
                .is_none()
            {
                tracing::warn!("Encoder pid {} still running after grace period", encoder.pid());
                encoder.log().warn("Still running after grace period, terminating");
                encoder.terminate();
                if encoder
                    .wait_timeout(Duration::from_millis(200), self.poll_interval)
                    .is_none()
                {
                    encoder.kill_and_reap();
                }
            }
        }

        handle.producer.finish_reader();
        if let Some(encoder) = handle.encoder.as_mut() {
            encoder.finish_reader();
        }

        let last = handle.encoder.as_ref().unwrap_or(&handle.producer);
        let status = match last.exit_status() {
            Some(exit) if exit.success() => RunStatus::Completed(0),
            Some(exit) => RunStatus::Failed(format!(
                "stopped before completion ({} {})",
                last.log().label(),
                process::describe_exit(exit)
            )),
            None => RunStatus::Failed("stopped before completion".to_string()),
        };
        self.finish(handle, status.clone());
        status
    }

    /// Block until the run is terminal, polling at the configured interval.
    pub fn wait(&self, handle: &mut RunHandle) -> RunStatus {
        loop {
            let status = self.poll(handle);
            if status.is_terminal() {
                return status;
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Kill everything after an unrecoverable query error.
    fn abort(&self, handle: &mut RunHandle, message: String) -> RunStatus {
        tracing::error!("{}", message);
        handle.kill_all();
        let status = RunStatus::Failed(message);
        self.finish(handle, status.clone());
        status
    }

    fn finish(&self, handle: &mut RunHandle, status: RunStatus) {
        let log = handle
            .encoder
            .as_ref()
            .map(SupervisedChild::log)
            .unwrap_or_else(|| handle.producer.log());
        match &status {
            RunStatus::Completed(_) => {
                log.success("Run completed");
                tracing::info!("Run (pid {}) completed", handle.pid());
            }
            RunStatus::Failed(message) => {
                log.error(message);
                tracing::warn!("Run (pid {}) failed: {}", handle.pid(), message);
            }
            RunStatus::Running => {}
        }
        handle.producer.log().flush();
        if let Some(encoder) = handle.encoder.as_ref() {
            encoder.log().flush();
        }
        handle.status = status;
    }

    /// Per-child log, file-backed when a logs folder is configured.
    fn run_log(&self, args: &[String]) -> SupervisorResult<Arc<RunLog>> {
        let program = args.first().ok_or(SupervisorError::EmptyCommand)?;
        let label = Path::new(program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| program.clone());

        let mut log = match &self.logs_dir {
            Some(dir) => {
                let stem = format!("{}_{}", label, chrono::Local::now().format("%Y%m%d_%H%M%S%3f"));
                match RunLog::with_file(label.clone(), dir, &stem, self.log_config.clone()) {
                    Ok(log) => log,
                    Err(e) => {
                        tracing::warn!("Could not create run log in {}: {}", dir.display(), e);
                        RunLog::new(label, self.log_config.clone())
                    }
                }
            }
            None => RunLog::new(label, self.log_config.clone()),
        };

        if let Some(callback) = &self.line_callback {
            let callback = Arc::clone(callback);
            log = log.with_callback(Box::new(move |line: &str| callback(line)));
        }
        Ok(Arc::new(log))
    }
}

fn outcome(failure: Option<String>) -> RunStatus {
    match failure {
        None => RunStatus::Completed(0),
        Some(message) => RunStatus::Failed(message),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::init_test_tracing;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tempfile::tempdir;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn sh(script: &str) -> Vec<String> {
        args(&["sh", "-c", script])
    }

    fn supervisor() -> Supervisor {
        init_test_tracing();
        Supervisor::new()
            .with_stop_grace(Duration::from_millis(500))
            .with_poll_interval(Duration::from_millis(10))
    }

    fn is_alive(pid: u32) -> bool {
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    #[test]
    fn clean_exit_completes() {
        let sup = supervisor();
        let mut handle = sup.start(&sh("exit 0")).unwrap();
        assert_eq!(sup.wait(&mut handle), RunStatus::Completed(0));
        assert!(!handle.is_running());
    }

    #[test]
    fn nonzero_exit_fails_with_stderr() {
        let sup = supervisor();
        let mut handle = sup.start(&sh("echo 'fatal: bad repo' >&2; exit 3")).unwrap();
        assert_eq!(
            sup.wait(&mut handle),
            RunStatus::Failed("fatal: bad repo".to_string())
        );
        assert_eq!(handle.stderr_tail(), vec!["fatal: bad repo"]);
    }

    #[test]
    fn silent_failure_reports_exit_code() {
        let sup = supervisor();
        let mut handle = sup.start(&sh("exit 4")).unwrap();
        assert_eq!(
            sup.wait(&mut handle),
            RunStatus::Failed("sh exited with code 4".to_string())
        );
    }

    #[test]
    fn missing_executable_is_launch_error() {
        let sup = supervisor();
        let err = sup.start(&args(&["ggui-no-such-gource", "/repo"])).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ggui-no-such-gource"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let sup = supervisor();
        assert!(matches!(sup.start(&[]), Err(SupervisorError::EmptyCommand)));
    }

    #[test]
    fn poll_does_not_block_on_live_child() {
        let sup = supervisor();
        let mut handle = sup.start(&args(&["sleep", "30"])).unwrap();

        let begun = Instant::now();
        assert_eq!(sup.poll(&mut handle), RunStatus::Running);
        assert!(begun.elapsed() < Duration::from_secs(1));

        let status = sup.stop(&mut handle);
        assert!(status.is_terminal());
        assert!(!is_alive(handle.pid()));
    }

    #[test]
    fn stop_on_completed_handle_is_noop() {
        let sup = supervisor();
        let mut handle = sup.start(&sh("exit 0")).unwrap();
        assert_eq!(sup.wait(&mut handle), RunStatus::Completed(0));

        assert_eq!(sup.stop(&mut handle), RunStatus::Completed(0));
        assert_eq!(handle.status(), &RunStatus::Completed(0));
    }

    #[test]
    fn stop_is_idempotent() {
        let sup = supervisor();
        let mut handle = sup.start(&args(&["sleep", "30"])).unwrap();
        let first = sup.stop(&mut handle);
        let second = sup.stop(&mut handle);
        assert_eq!(first, second);
        assert!(matches!(first, RunStatus::Failed(ref m) if m.starts_with("stopped before completion")));
    }

    #[test]
    fn pipeline_drains_producer_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("frames.txt");
        let sup = supervisor();

        let mut handle = sup
            .start_pipeline(
                &sh("printf 'frame1\\nframe2\\n'"),
                &sh(&format!("exec cat > '{}'", out.display())),
            )
            .unwrap();

        assert!(handle.is_export());
        assert_eq!(sup.wait(&mut handle), RunStatus::Completed(0));
        assert_eq!(fs::read_to_string(&out).unwrap(), "frame1\nframe2\n");
    }

    #[test]
    fn stopping_pipeline_leaves_no_encoder() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("frames.bin");
        let sup = supervisor();

        let mut handle = sup
            .start_pipeline(
                &args(&["yes", "frame"]),
                &sh(&format!("exec cat > '{}'", out.display())),
            )
            .unwrap();
        let encoder_pid = handle.encoder_pid().unwrap();

        let status = sup.stop(&mut handle);
        assert!(status.is_terminal());
        // cat finishes cleanly once its input closes
        assert_eq!(status, RunStatus::Completed(0));
        assert!(!is_alive(encoder_pid));
        assert!(!is_alive(handle.pid()));
    }

    #[test]
    fn stubborn_encoder_is_killed_after_grace() {
        let sup = supervisor().with_stop_grace(Duration::from_millis(200));

        let mut handle = sup
            .start_pipeline(
                &args(&["sleep", "30"]),
                &sh("trap '' TERM; exec sleep 30"),
            )
            .unwrap();
        let encoder_pid = handle.encoder_pid().unwrap();

        let begun = Instant::now();
        let status = sup.stop(&mut handle);
        assert!(begun.elapsed() < Duration::from_secs(5));
        assert!(matches!(status, RunStatus::Failed(ref m) if m.contains("signal 9")));
        assert!(!is_alive(encoder_pid));
    }

    #[test]
    fn stop_escalation_is_logged() {
        let lines = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let sup = supervisor()
            .with_stop_grace(Duration::from_millis(200))
            .with_line_callback(Arc::new(move |line: &str| sink.lock().push(line.to_string())));

        let mut handle = sup
            .start_pipeline(
                &args(&["sleep", "30"]),
                &sh("trap '' TERM; exec sleep 30"),
            )
            .unwrap();
        sup.stop(&mut handle);

        let lines = lines.lock();
        assert!(lines
            .iter()
            .any(|l| l.contains("[WARNING] Still running after grace period")));
    }

    #[test]
    fn encoder_failure_is_preferred() {
        let sup = supervisor();
        let mut handle = sup
            .start_pipeline(
                &sh("echo 'producer noise' >&2; exit 1"),
                &sh("echo 'Unknown encoder' >&2; exit 2"),
            )
            .unwrap();
        assert_eq!(
            sup.wait(&mut handle),
            RunStatus::Failed("Unknown encoder".to_string())
        );
    }

    #[test]
    fn encoder_launch_failure_reaps_producer() {
        let sup = supervisor().with_ffmpeg("ggui-no-such-ffmpeg");
        let dir = tempdir().unwrap();

        let err = sup
            .start_with_export(
                &args(&["sleep", "30"]),
                &dir.path().join("out.mp4"),
                &ExportOptions::default(),
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn export_rejects_bad_framerate_before_spawning() {
        let sup = supervisor();
        let options = ExportOptions {
            framerate: 12,
            ..ExportOptions::default()
        };
        let err = sup
            .start_with_export(&args(&["sleep", "30"]), Path::new("out.mp4"), &options)
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Build(_)));
    }

    #[test]
    fn export_progress_comes_from_encoder() {
        let sup = supervisor();
        let mut handle = sup
            .start_pipeline(
                &sh("exit 0"),
                &sh("printf 'frame=10 time=00:00:01.50 bitrate=1\\r' >&2; cat > /dev/null"),
            )
            .unwrap();
        assert_eq!(sup.wait(&mut handle), RunStatus::Completed(0));
        assert_eq!(handle.export_progress().as_deref(), Some("00:00:01.50"));
    }

    #[test]
    fn run_logs_are_written_to_logs_dir() {
        let dir = tempdir().unwrap();
        let sup = supervisor()
            .with_logs_dir(dir.path())
            .with_log_config(LogConfig::debug());

        let mut handle = sup.start(&sh("echo visible >&2")).unwrap();
        sup.wait(&mut handle);

        let paths = handle.log_paths();
        assert_eq!(paths.len(), 1);
        let content = fs::read_to_string(&paths[0]).unwrap();
        assert!(content.contains("visible"));
        assert!(content.contains("Run completed"));
    }

    #[test]
    fn line_callback_sees_command() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sup = supervisor().with_line_callback(Arc::new(move |_: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let mut handle = sup.start(&sh("exit 0")).unwrap();
        sup.wait(&mut handle);
        // command line and completion message
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn dropping_running_handle_kills_child() {
        let sup = supervisor();
        let handle = sup.start(&args(&["sleep", "30"])).unwrap();
        let pid = handle.pid();
        drop(handle);
        assert!(!is_alive(pid));
    }
}
