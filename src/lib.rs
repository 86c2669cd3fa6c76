//! # rebootvisor
//!
//! **Rebootvisor** supervises a single long-running console server process and
//! drives scheduled graceful-restart cycles with staged advance warnings
//! delivered over the child's standard input.
//!
//! It is built for unattended maintenance windows: the operator configures a
//! repeating daily reboot schedule plus a ladder of countdown announcements,
//! and rebootvisor keeps the server up in between, restarting it (after the
//! configured delay) whenever it exits unexpectedly.
//!
//! ## Architecture
//! ```text
//!   Config (reboot_config.json)
//!       │
//!       ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Controller (reboot-cycle state machine)                      │
//! │  - schedule::next_reboot: next instant from daily slots       │
//! │  - RebootPlan: (fire instant, rendered message) ladder        │
//! │  - ProcessSupervisor: launch / stdin / poll / wait / kill     │
//! │  - Bus (broadcast lifecycle events)                           │
//! └──────┬──────────────────────────────┬─────────────────────────┘
//!        │ `announcement "<msg>"`       │ Events:
//!        │ `exit`                       │ - ProcessStarted
//!        ▼                              │ - AnnouncementSent
//! ┌──────────────┐                      │ - UnexpectedExit
//! │ server child │                      │ - ForcedTermination ...
//! │ (stdin piped,│                      ▼
//! │  console     │             ┌─────────────────┐
//! │  inherited)  │             │  SubscriberSet  │
//! └──────────────┘             │ (per-sub queue  │
//!                              │  + worker task) │
//!                              └────────┬────────┘
//!                                       ▼
//!                          LogWriter / custom Subscribe impls
//! ```
//!
//! ## Cycle
//! ```text
//! loop {
//!   ├─► launch server (stdin piped + priming newline, console inherited)
//!   ├─► next_reboot(now, schedule) ─► RebootPlan (announcement ladder)
//!   ├─► wait loop:
//!   │     ├─ announcement due  ─► send `announcement "<msg>"`
//!   │     ├─ target reached    ─► send `exit`, wait exit_grace,
//!   │     │                       force-terminate on overrun
//!   │     └─ child exited      ─► UnexpectedExit, restart after delay,
//!   │                             reuse the pending plan if the target
//!   │                             is still in the future
//!   └─► sleep restart_delay, relaunch
//! }
//! ```
//!
//! A schedule with no enabled entries is not an error: the controller degrades
//! to restart-on-exit-only supervision.
//!
//! ## Cancellation
//! An operator signal (SIGINT/SIGTERM/SIGQUIT, Ctrl-C on Windows) cancels the
//! runtime token. The controller then makes a bounded best-effort graceful
//! shutdown of the child (`exit` command, `stop_grace` wait, forced
//! termination fallback) before returning, so no orphan server is left behind.
//!
//! ## Example
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use rebootvisor::{Config, Controller, LogWriter, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::from_file(Path::new("reboot_config.json"))?;
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!     let controller = Controller::new(cfg, subs);
//!     controller.run().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod process;
mod schedule;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::Controller;
pub use error::{ConfigError, ProcessError, RuntimeError};
pub use events::{Bus, Event, EventKind, Level};
pub use policies::BackoffPolicy;
pub use process::{ProcessStatus, ProcessSupervisor, SupervisedProcess, WaitOutcome};
pub use schedule::{next_reboot, Announcement, AnnouncementRule, RebootPlan, ScheduleEntry};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
