//! # Runtime events emitted by the controller and process supervisor.
//!
//! [`EventKind`] classifies events across the reboot cycle: process lifecycle
//! (launch, exit), schedule decisions (next reboot instant, announcement
//! ladder), the shutdown protocol (graceful exit request, grace overrun,
//! forced termination), and operator actions.
//!
//! The [`Event`] struct carries metadata: wall-clock timestamp, a global
//! monotonic sequence number, and optional pid/code/message/delay/instant
//! fields attached via builder methods.
//!
//! Every kind maps to a log [`Level`] via [`EventKind::level`], so sinks can
//! render the stream without maintaining their own severity tables.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::NaiveDateTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Log severity derived from an event's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Routine lifecycle transitions and scheduled times.
    Info,
    /// Unexpected exits, lost writes, grace overruns, launch retries.
    Warn,
    /// Launch failures and forced terminations.
    Error,
}

impl Level {
    /// Returns the conventional uppercase label for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process lifecycle ===
    /// The supervisor is about to spawn the server.
    ///
    /// Sets: `message` (executable path).
    ProcessStarting,

    /// The server process is up and its stdin has been primed.
    ///
    /// Sets: `pid`.
    ProcessStarted,

    /// The server exited as part of a shutdown the controller initiated.
    ///
    /// Sets: `code` (`None` if killed by signal).
    ProcessExited,

    /// The server exited without the controller requesting it.
    ///
    /// Sets: `code`.
    UnexpectedExit,

    /// Spawning the server failed.
    ///
    /// Sets: `message` (error description).
    LaunchFailed,

    /// A failed launch will be retried after a delay.
    ///
    /// Sets: `delay`.
    LaunchRetryScheduled,

    // === Schedule ===
    /// The next reboot instant has been computed.
    ///
    /// Sets: `when`.
    RebootScheduled,

    /// No enabled schedule entries; supervision degrades to restart-on-exit only.
    NoScheduleConfigured,

    /// An announcement command was written to the child's stdin.
    ///
    /// Sets: `message` (rendered announcement text).
    AnnouncementSent,

    // === Shutdown protocol ===
    /// The graceful-exit command was sent to the child.
    ///
    /// Sets: `pid`.
    ExitRequested,

    /// The child did not exit within the grace period.
    ///
    /// Sets: `delay` (the grace period that elapsed).
    GraceExceeded,

    /// The child was force-terminated.
    ///
    /// Sets: `code` on confirmed exit, `message` if termination was not confirmed.
    ForcedTermination,

    /// A relaunch is scheduled after the restart delay.
    ///
    /// Sets: `delay`.
    RestartScheduled,

    // === Supervisor ===
    /// A write to the child's stdin failed (command lost, cycle continues).
    ///
    /// Sets: `message` (error description).
    WriteFailed,

    /// Operator requested shutdown (OS signal observed).
    ShutdownRequested,

    /// The supervisor finished its run loop.
    SupervisorStopped,
}

impl EventKind {
    /// Returns the log level this event is reported at.
    pub fn level(&self) -> Level {
        match self {
            EventKind::ProcessStarting
            | EventKind::ProcessStarted
            | EventKind::ProcessExited
            | EventKind::RebootScheduled
            | EventKind::AnnouncementSent
            | EventKind::ExitRequested
            | EventKind::RestartScheduled
            | EventKind::ShutdownRequested
            | EventKind::SupervisorStopped => Level::Info,
            EventKind::UnexpectedExit
            | EventKind::LaunchRetryScheduled
            | EventKind::NoScheduleConfigured
            | EventKind::GraceExceeded
            | EventKind::WriteFailed => Level::Warn,
            EventKind::LaunchFailed | EventKind::ForcedTermination => Level::Error,
        }
    }
}

/// A single runtime event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event classification.
    pub kind: EventKind,
    /// Wall-clock timestamp of publication.
    pub at: SystemTime,
    /// Globally monotonic sequence number.
    pub seq: u64,
    /// Child process id, when known.
    pub pid: Option<u32>,
    /// Child exit code (`None` if the process was killed by a signal).
    pub code: Option<i32>,
    /// Human-readable payload (path, announcement text, error description).
    pub message: Option<Arc<str>>,
    /// Associated duration (restart delay, grace period, retry delay).
    pub delay: Option<Duration>,
    /// Associated local calendar instant (scheduled reboot time).
    pub when: Option<NaiveDateTime>,
}

impl Event {
    /// Creates an event stamped with the current time and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            pid: None,
            code: None,
            message: None,
            delay: None,
            when: None,
        }
    }

    /// Attaches a child process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a child exit code (`None` = killed by signal).
    #[inline]
    pub fn with_code(mut self, code: Option<i32>) -> Self {
        self.code = code;
        self
    }

    /// Attaches a human-readable message.
    #[inline]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a duration (delay/grace).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Attaches a local calendar instant.
    #[inline]
    pub fn with_when(mut self, when: NaiveDateTime) -> Self {
        self.when = Some(when);
        self
    }

    /// Returns the log level of this event.
    #[inline]
    pub fn level(&self) -> Level {
        self.kind.level()
    }
}
