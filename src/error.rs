//! Error types used by the rebootvisor runtime.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`] — configuration loading/validation failures (fatal at startup).
//! - [`ProcessError`] — child-process launch and stdin-write failures.
//! - [`RuntimeError`] — errors raised by the supervision runtime itself.
//!
//! [`ProcessError`] distinguishes recoverable failures (a broken stdin pipe is
//! logged and the cycle continues; the eventual shutdown falls back to forced
//! termination) from launch failures, which are fatal on the very first launch
//! and retried with backoff afterwards. Helper methods (`as_label`,
//! `is_recoverable`) support logging and branching without string matching.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the configuration file.
///
/// All of these are fatal: the supervisor refuses to start on a broken config.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    Read {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON (or does not match the expected shape).
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// `server_path` does not point at a readable file.
    #[error("server executable missing or unreadable: {path:?}")]
    ServerPath {
        /// The configured server path.
        path: PathBuf,
    },

    /// A schedule entry carries an out-of-range hour or minute.
    #[error("schedule entry out of range: {hour:02}:{minute:02}")]
    ScheduleRange {
        /// Configured hour (valid: 0–23).
        hour: u8,
        /// Configured minute (valid: 0–59).
        minute: u8,
    },

    /// An announcement rule sets both or neither of `minutes_before`/`seconds_before`.
    #[error("announcement rule must set exactly one of minutes_before/seconds_before: {message:?}")]
    AmbiguousOffset {
        /// The rule's message template (for identification in logs).
        message: String,
    },

    /// An announcement rule has a zero offset.
    #[error("announcement offset must be positive: {message:?}")]
    ZeroOffset {
        /// The rule's message template.
        message: String,
    },
}

/// Errors raised while managing the supervised child process.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The server executable does not exist.
    #[error("server executable not found: {path:?}")]
    NotFound {
        /// Path that failed the existence check.
        path: PathBuf,
    },

    /// The server executable exists but lacks execute permission.
    #[error("server executable is not executable: {path:?}")]
    NotExecutable {
        /// Path that failed the permission check.
        path: PathBuf,
    },

    /// The OS refused to spawn the process.
    #[error("failed to spawn {path:?}: {source}")]
    Spawn {
        /// Path of the executable.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The spawned child exposes no stdin handle.
    #[error("child process has no stdin handle")]
    StdinUnavailable,

    /// Writing a command line to the child's stdin failed (pipe closed/broken).
    #[error("failed to write to child stdin: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::NotFound { .. } => "process_not_found",
            ProcessError::NotExecutable { .. } => "process_not_executable",
            ProcessError::Spawn { .. } => "process_spawn_failed",
            ProcessError::StdinUnavailable => "process_stdin_unavailable",
            ProcessError::Write { .. } => "process_write_failed",
        }
    }

    /// Whether the cycle may continue after this error.
    ///
    /// Stdin-write failures are advisory: the command is lost, the process keeps
    /// running, and a later shutdown falls back to forced termination. Launch
    /// failures are not recoverable within the current cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProcessError::Write { .. } | ProcessError::StdinUnavailable
        )
    }
}

/// Errors produced by the supervision runtime itself.
///
/// The runtime never terminates on a recoverable error; the only hard failure
/// is a launch error on the very first launch, when no process can ever be
/// supervised.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The very first launch of the server failed.
    #[error("initial server launch failed: {source}")]
    Launch {
        /// The launch failure.
        #[source]
        source: ProcessError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Launch { .. } => "runtime_launch_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_errors_are_recoverable() {
        let err = ProcessError::Write {
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.as_label(), "process_write_failed");
    }

    #[test]
    fn launch_errors_are_not_recoverable() {
        let err = ProcessError::NotFound {
            path: PathBuf::from("/missing/server"),
        };
        assert!(!err.is_recoverable());
    }
}
