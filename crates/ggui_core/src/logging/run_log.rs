//! Per-run logger for supervised child processes.
//!
//! Each spawned process gets a `RunLog` that:
//! - Keeps a tail buffer of recent output lines (used for failure messages)
//! - Optionally writes to a dedicated log file
//! - Optionally sends lines to a GUI callback
//! - Remembers the last encoder progress marker (`time=...`)

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineCallback, LogConfig, LogLevel, MessagePrefix};

/// Logger shared between a run's reader thread and its handle.
pub struct RunLog {
    /// Label for identification (e.g. "gource", "ffmpeg").
    label: String,
    /// Path to the log file, if any.
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Option<LineCallback>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last `time=` value reported by the encoder.
    progress: Mutex<Option<String>>,
}

impl RunLog {
    /// Create an in-memory log with no file or callback.
    pub fn new(label: impl Into<String>, config: LogConfig) -> Self {
        let capacity = config.error_tail;
        Self {
            label: label.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback: None,
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            progress: Mutex::new(None),
        }
    }

    /// Create a log that also writes to `<log_dir>/<file_stem>.log`.
    pub fn with_file(
        label: impl Into<String>,
        log_dir: impl AsRef<Path>,
        file_stem: &str,
        config: LogConfig,
    ) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(file_stem)));
        let file = File::create(&log_path)?;

        let mut log = Self::new(label, config);
        log.log_path = Some(log_path);
        log.file_writer = Mutex::new(Some(BufWriter::new(file)));
        Ok(log)
    }

    /// Attach a callback that receives every emitted line.
    pub fn with_callback(mut self, callback: LineCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Get the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the log file path, if writing to a file.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&self.format_message(message));
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log the command being executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Record one line of child stderr.
    ///
    /// Always kept in the tail buffer; only echoed to file and callback
    /// when not in compact mode.
    pub fn output_line(&self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }

        if let Some(time) = parse_progress_time(line) {
            *self.progress.lock() = Some(time);
        }

        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 {
                if buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        tracing::debug!(target: "ggui_core::child", "[{}] {}", self.label, line);

        if self.config.compact {
            return;
        }
        self.output(&self.format_message(&MessagePrefix::Stderr.format(line)));
    }

    /// Get the current tail buffer contents.
    pub fn tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Tail buffer joined into a single message.
    pub fn tail_text(&self) -> String {
        self.tail().join("\n")
    }

    /// Last encoder progress marker seen, e.g. `00:01:02.50`.
    pub fn progress(&self) -> Option<String> {
        self.progress.lock().clone()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the log file and release it.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLog")
            .field("label", &self.label)
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

/// Extract the `time=` value from an ffmpeg progress line.
fn parse_progress_time(line: &str) -> Option<String> {
    let (_, rest) = line.rsplit_once("time=")?;
    let value = rest.split_whitespace().next()?;
    if value.is_empty() || value.starts_with("N/A") {
        return None;
    }
    Some(value.to_string())
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn tail_buffer_maintains_limit() {
        let config = LogConfig {
            error_tail: 3,
            ..LogConfig::default()
        };
        let log = RunLog::new("gource", config);

        for i in 0..10 {
            log.output_line(&format!("Line {}", i));
        }

        assert_eq!(log.tail(), vec!["Line 7", "Line 8", "Line 9"]);
        assert_eq!(log.tail_text(), "Line 7\nLine 8\nLine 9");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let log = RunLog::new("gource", LogConfig::default());
        log.output_line("   ");
        log.output_line("");
        assert!(log.tail().is_empty());
    }

    #[test]
    fn tracks_encoder_progress() {
        let log = RunLog::new("ffmpeg", LogConfig::default());
        log.output_line("frame=  120 fps= 60 q=28.0 size=  256kB time=00:00:02.00 bitrate= 1048.6kbits/s");
        log.output_line("frame=  240 fps= 60 q=28.0 size=  512kB time=00:00:04.00 bitrate= 1048.6kbits/s");
        assert_eq!(log.progress().as_deref(), Some("00:00:04.00"));

        log.output_line("size=N/A time=N/A bitrate=N/A");
        assert_eq!(log.progress().as_deref(), Some("00:00:04.00"));
    }

    #[test]
    fn writes_to_file_when_not_compact() {
        let dir = tempdir().unwrap();
        let log = RunLog::with_file("gource", dir.path(), "run 1", LogConfig::debug()).unwrap();

        log.command("gource /repo");
        log.output_line("something odd happened");
        log.flush();

        let path = log.log_path().unwrap().to_path_buf();
        assert!(path.ends_with("run_1.log"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("$ gource /repo"));
        assert!(content.contains("[stderr] something odd happened"));
    }

    #[test]
    fn compact_mode_keeps_output_out_of_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let log = RunLog::new("gource", LogConfig::default()).with_callback(Box::new(move |_: &str| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        log.info("starting");
        log.output_line("stderr noise");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(log.tail(), vec!["stderr noise"]);
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
