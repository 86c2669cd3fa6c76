//! # ProcessSupervisor: the single child-process slot.
//!
//! Launches the server with its working directory set to the executable's
//! directory (so relative resource paths resolve), stdin piped for command
//! injection, and stdout/stderr left attached to the inherited console, so
//! the server keeps its own console output.
//!
//! ## Priming write
//! Immediately after spawn, one harmless newline is written to the child's
//! stdin. Some server runtimes observe stdin at EOF before their first
//! application-level read and exit early; the priming write closes that race
//! before the scheduler's first real command arrives.
//!
//! ## Rules
//! - Writes to stdin are serialized through `&mut SupervisedProcess`
//!   (interleaved partial writes would corrupt command lines).
//! - A lost write is advisory: it is published as [`EventKind::WriteFailed`]
//!   and the cycle continues.
//! - A handle is dead once `Exited` is observed; each launch creates a fresh
//!   [`SupervisedProcess`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::time;

use crate::error::ProcessError;
use crate::events::{Bus, Event, EventKind};

/// Lifecycle status of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Spawned, stdin not yet primed.
    Starting,
    /// Up and accepting commands.
    Running,
    /// Graceful exit requested, waiting for the process to comply.
    Exiting,
    /// Exit observed (`None` = killed by signal). The handle is dead.
    Exited(Option<i32>),
}

/// Result of a bounded wait for process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process exited with the given code within the bound.
    Exited(Option<i32>),
    /// The bound elapsed with the process still alive. Nothing was killed.
    TimedOut,
}

/// An exclusively-owned handle to one launched server process.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    stdin: ChildStdin,
    /// Wall-clock launch time.
    pub started_at: SystemTime,
    status: ProcessStatus,
}

impl SupervisedProcess {
    /// OS process id, if the process has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Current lifecycle status as of the last observation.
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Waits for the process to exit and returns its code.
    ///
    /// Cancel safe: dropping the future does not lose the child, so this is
    /// used inside `select!` against timers.
    pub async fn wait(&mut self) -> Option<i32> {
        let code = match self.child.wait().await {
            Ok(status) => status.code(),
            Err(_) => None,
        };
        self.status = ProcessStatus::Exited(code);
        code
    }

    /// Writes one newline-terminated command line to stdin and flushes.
    async fn write_line(&mut self, text: &str) -> Result<(), ProcessError> {
        let write = async {
            self.stdin.write_all(text.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await
        };
        write.await.map_err(|source| ProcessError::Write { source })
    }
}

/// Launches and manages the single supervised child process.
///
/// Holds the event bus so every lifecycle action is observable; the
/// controller owns the [`SupervisedProcess`] handles themselves.
#[derive(Clone)]
pub struct ProcessSupervisor {
    bus: Bus,
}

impl ProcessSupervisor {
    /// Creates a supervisor publishing to the given bus.
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    /// Launches the server process.
    ///
    /// The working directory is set to the executable's parent so the server
    /// finds its config/resources next to the binary. Stdout/stderr are
    /// inherited; only stdin is captured. The returned handle has already
    /// received its priming write.
    ///
    /// Fails with [`ProcessError::NotFound`]/[`ProcessError::NotExecutable`]
    /// before spawning if the path cannot work.
    pub async fn launch(
        &self,
        path: &Path,
        args: &[String],
    ) -> Result<SupervisedProcess, ProcessError> {
        check_executable(path)?;

        let workdir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        self.bus.publish(
            Event::now(EventKind::ProcessStarting).with_message(path.display().to_string()),
        );

        let mut child = Command::new(path)
            .args(args)
            .current_dir(&workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(ProcessError::StdinUnavailable)?;
        let mut process = SupervisedProcess {
            child,
            stdin,
            started_at: SystemTime::now(),
            status: ProcessStatus::Starting,
        };

        // Priming write; a failure here is advisory like any other lost write.
        if let Err(e) = process.write_line("").await {
            self.bus
                .publish(Event::now(EventKind::WriteFailed).with_message(e.to_string()));
        }
        process.status = ProcessStatus::Running;

        let mut started = Event::now(EventKind::ProcessStarted);
        if let Some(pid) = process.pid() {
            started = started.with_pid(pid);
        }
        self.bus.publish(started);

        Ok(process)
    }

    /// Writes a newline-terminated command to the child's stdin.
    ///
    /// On failure, publishes [`EventKind::WriteFailed`] and returns a
    /// recoverable error; callers treat the command as lost, never as a
    /// reason to abort the cycle.
    pub async fn send_command(
        &self,
        process: &mut SupervisedProcess,
        text: &str,
    ) -> Result<(), ProcessError> {
        match process.write_line(text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.bus
                    .publish(Event::now(EventKind::WriteFailed).with_message(e.to_string()));
                Err(e)
            }
        }
    }

    /// Non-blocking liveness check.
    pub fn poll(&self, process: &mut SupervisedProcess) -> ProcessStatus {
        match process.child.try_wait() {
            Ok(Some(status)) => {
                process.status = ProcessStatus::Exited(status.code());
                process.status
            }
            Ok(None) => process.status,
            Err(_) => {
                process.status = ProcessStatus::Exited(None);
                process.status
            }
        }
    }

    /// Sends the graceful `exit` command and marks the process as exiting.
    pub async fn request_graceful_exit(&self, process: &mut SupervisedProcess) {
        process.status = ProcessStatus::Exiting;
        let mut ev = Event::now(EventKind::ExitRequested);
        if let Some(pid) = process.pid() {
            ev = ev.with_pid(pid);
        }
        self.bus.publish(ev);
        // Advisory: if the pipe is gone the eventual shutdown falls back to kill.
        let _ = self.send_command(process, "exit").await;
    }

    /// Waits up to `timeout` for the process to exit. Does not kill on
    /// timeout; the caller decides how to escalate.
    pub async fn wait_for_exit(
        &self,
        process: &mut SupervisedProcess,
        timeout: Duration,
    ) -> WaitOutcome {
        match time::timeout(timeout, process.wait()).await {
            Ok(code) => WaitOutcome::Exited(code),
            Err(_elapsed) => WaitOutcome::TimedOut,
        }
    }

    /// Kills the process and waits up to `confirm` for the exit to be
    /// observed.
    ///
    /// Publishes [`EventKind::ForcedTermination`] with the exit code on
    /// confirmation, or with a note when the process still would not die.
    pub async fn force_terminate(&self, process: &mut SupervisedProcess, confirm: Duration) {
        let _ = process.child.start_kill();
        let ev = match time::timeout(confirm, process.wait()).await {
            Ok(code) => Event::now(EventKind::ForcedTermination).with_code(code),
            Err(_elapsed) => Event::now(EventKind::ForcedTermination)
                .with_message(format!("termination not confirmed within {confirm:?}")),
        };
        self.bus.publish(ev);
    }
}

fn check_executable(path: &Path) -> Result<(), ProcessError> {
    let metadata = std::fs::metadata(path).map_err(|_| ProcessError::NotFound {
        path: path.to_path_buf(),
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ProcessError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    #[cfg(not(unix))]
    let _ = &metadata;

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    /// Loops on stdin until it reads the literal `exit` command.
    const OBEDIENT: &str = r#"while read line; do [ "$line" = exit ] && exit 0; done"#;

    #[tokio::test]
    async fn launch_missing_path_fails() {
        let sup = ProcessSupervisor::new(Bus::new(16));
        let err = sup
            .launch(Path::new("/nonexistent/server"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[tokio::test]
    async fn graceful_exit_command_is_honored() {
        let sup = ProcessSupervisor::new(Bus::new(16));
        let (path, args) = sh(OBEDIENT);
        let mut proc = sup.launch(&path, &args).await.unwrap();
        assert_eq!(proc.status(), ProcessStatus::Running);

        sup.request_graceful_exit(&mut proc).await;
        let outcome = sup.wait_for_exit(&mut proc, Duration::from_secs(5)).await;
        assert_eq!(outcome, WaitOutcome::Exited(Some(0)));
        assert_eq!(proc.status(), ProcessStatus::Exited(Some(0)));
    }

    #[tokio::test]
    async fn priming_write_does_not_terminate_a_line_reader() {
        // The primed empty line must be ignored by a server that reads
        // commands line by line.
        let sup = ProcessSupervisor::new(Bus::new(16));
        let (path, args) = sh(OBEDIENT);
        let mut proc = sup.launch(&path, &args).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sup.poll(&mut proc), ProcessStatus::Running);

        sup.request_graceful_exit(&mut proc).await;
        let outcome = sup.wait_for_exit(&mut proc, Duration::from_secs(5)).await;
        assert!(matches!(outcome, WaitOutcome::Exited(_)));
    }

    #[tokio::test]
    async fn wait_for_exit_times_out_without_killing() {
        let sup = ProcessSupervisor::new(Bus::new(16));
        let (path, args) = sh("exec sleep 30");
        let mut proc = sup.launch(&path, &args).await.unwrap();

        let outcome = sup
            .wait_for_exit(&mut proc, Duration::from_millis(100))
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert_eq!(sup.poll(&mut proc), ProcessStatus::Running);

        sup.force_terminate(&mut proc, Duration::from_secs(5)).await;
        assert!(matches!(proc.status(), ProcessStatus::Exited(_)));
    }

    #[tokio::test]
    async fn write_after_exit_is_advisory() {
        let bus = Bus::new(16);
        let sup = ProcessSupervisor::new(bus.clone());
        let mut rx = bus.subscribe();

        let (path, args) = sh("exit 0");
        let mut proc = sup.launch(&path, &args).await.unwrap();
        proc.wait().await;

        let err = sup
            .send_command(&mut proc, "announcement \"too late\"")
            .await
            .unwrap_err();
        assert!(err.is_recoverable());

        let mut saw_write_failed = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::WriteFailed {
                saw_write_failed = true;
            }
        }
        assert!(saw_write_failed);
    }
}
