//! A single supervised child process.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::errors::{SupervisorError, SupervisorResult};
use crate::logging::RunLog;

/// How long to wait for a stderr reader after its process exited.
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// A spawned child with its stderr drained into a `RunLog`.
pub(crate) struct SupervisedChild {
    args: Vec<String>,
    child: Child,
    log: Arc<RunLog>,
    reader: Option<JoinHandle<()>>,
    exit: Option<ExitStatus>,
}

impl SupervisedChild {
    /// Spawn `args[0]` with the remaining tokens.
    pub fn spawn(
        args: &[String],
        stdin: Stdio,
        stdout: Stdio,
        log: Arc<RunLog>,
    ) -> SupervisorResult<Self> {
        let (program, rest) = args.split_first().ok_or(SupervisorError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(rest).stdin(stdin).stdout(stdout).stderr(Stdio::piped());
        tracing::debug!("Spawning: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| SupervisorError::launch(program.clone(), e))?;

        let reader = child.stderr.take().map(|stderr| {
            let log = Arc::clone(&log);
            thread::spawn(move || drain_lines(stderr, &log))
        });

        Ok(Self {
            args: args.to_vec(),
            child,
            log,
            reader,
            exit: None,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Take the stdout pipe, if it was requested.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    pub fn has_exited(&self) -> bool {
        self.exit.is_some()
    }

    /// Non-blocking exit check; the status is cached once reaped.
    pub fn try_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait()?;
        }
        Ok(self.exit)
    }

    /// Poll until exit or until `timeout` elapses.
    pub fn wait_timeout(&mut self, timeout: Duration, interval: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_exit() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Failed to query pid {}: {}", self.pid(), e);
                    return None;
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(interval.min(deadline - now));
        }
    }

    /// Ask the process to exit (SIGTERM).
    #[cfg(unix)]
    pub fn terminate(&mut self) {
        if self.has_exited() {
            return;
        }
        // The child is not reaped yet, so the pid still belongs to it.
        let rc = unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!(
                "SIGTERM to pid {} failed: {}",
                self.pid(),
                io::Error::last_os_error()
            );
        }
    }

    #[cfg(not(unix))]
    pub fn terminate(&mut self) {
        if self.has_exited() {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!("Kill of pid {} failed: {}", self.pid(), e);
        }
    }

    /// Kill if still running, then reap.
    pub fn kill_and_reap(&mut self) {
        if self.has_exited() {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!("Kill of pid {} failed: {}", self.pid(), e);
        }
        match self.child.wait() {
            Ok(status) => self.exit = Some(status),
            Err(e) => tracing::warn!("Failed to reap pid {}: {}", self.pid(), e),
        }
    }

    /// Join the stderr reader, but never block on a pipe held open by a
    /// grandchild.
    pub fn finish_reader(&mut self) {
        let Some(reader) = self.reader.take() else {
            return;
        };
        let deadline = Instant::now() + READER_JOIN_TIMEOUT;
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if reader.is_finished() {
            let _ = reader.join();
        } else {
            tracing::debug!("stderr reader for pid {} still open, detaching", self.pid());
        }
    }

    /// Failure text for a finished process, `None` on success.
    pub fn failure_message(&self) -> Option<String> {
        let status = self.exit?;
        if status.success() {
            return None;
        }
        let tail = self.log.tail_text();
        if tail.trim().is_empty() {
            Some(format!("{} {}", self.log.label(), describe_exit(status)))
        } else {
            Some(tail)
        }
    }
}

/// Human-readable exit description.
pub(crate) fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    "terminated abnormally".to_string()
}

/// Feed `reader` into `log` line by line.
///
/// Both `\n` and `\r` end a line, since encoders redraw progress with `\r`.
pub(crate) fn drain_lines(mut reader: impl Read, log: &RunLog) {
    let mut buf = [0u8; 4096];
    let mut line: Vec<u8> = Vec::new();
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !line.is_empty() {
                    log.output_line(&String::from_utf8_lossy(&line));
                    line.clear();
                }
            } else {
                line.push(byte);
            }
        }
    }
    if !line.is_empty() {
        log.output_line(&String::from_utf8_lossy(&line));
    }
}
