//! # Console logging subscriber.
//!
//! [`LogWriter`] renders runtime events as timestamped, leveled log lines.
//! Info goes to stdout; warnings and errors go to stderr.
//!
//! ## Output format
//! ```text
//! 2026-08-26 03:55:00 [INFO ] reboot scheduled for 2026-08-26 04:00:00
//! 2026-08-26 03:55:00 [INFO ] announcement sent: "reboot in 5 minutes"
//! 2026-08-26 04:00:00 [INFO ] exit command sent pid=4242
//! 2026-08-26 04:01:00 [WARN ] grace period 60s exceeded
//! 2026-08-26 04:01:00 [ERROR] force-terminated code=None
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::events::{Event, EventKind, Level};

use super::Subscribe;

/// Console log sink for runtime events.
///
/// Renders every event with a wall-clock timestamp and a level derived from
/// [`EventKind::level`]. For structured logging or shipping to a file, write a
/// custom [`Subscribe`] implementation instead.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    fn render(e: &Event) -> String {
        match e.kind {
            EventKind::ProcessStarting => {
                format!("starting server: {}", e.message.as_deref().unwrap_or("?"))
            }
            EventKind::ProcessStarted => {
                format!("server started pid={:?}", e.pid)
            }
            EventKind::ProcessExited => {
                format!("server exited code={:?}", e.code)
            }
            EventKind::UnexpectedExit => {
                format!("server exited unexpectedly code={:?}", e.code)
            }
            EventKind::LaunchFailed => {
                format!("launch failed: {}", e.message.as_deref().unwrap_or("?"))
            }
            EventKind::LaunchRetryScheduled => {
                format!("launch retry in {:?}", e.delay.unwrap_or_default())
            }
            EventKind::RebootScheduled => match e.when {
                Some(when) => format!("reboot scheduled for {}", when.format("%Y-%m-%d %H:%M:%S")),
                None => "reboot scheduled".to_string(),
            },
            EventKind::NoScheduleConfigured => {
                "no enabled reboot schedule; restart-on-exit only".to_string()
            }
            EventKind::AnnouncementSent => {
                format!("announcement sent: {:?}", e.message.as_deref().unwrap_or(""))
            }
            EventKind::ExitRequested => {
                format!("exit command sent pid={:?}", e.pid)
            }
            EventKind::GraceExceeded => {
                format!("grace period {:?} exceeded", e.delay.unwrap_or_default())
            }
            EventKind::ForcedTermination => match &e.message {
                Some(msg) => format!("force-terminated: {msg}"),
                None => format!("force-terminated code={:?}", e.code),
            },
            EventKind::RestartScheduled => {
                format!("restart in {:?}", e.delay.unwrap_or_default())
            }
            EventKind::WriteFailed => {
                format!("stdin write failed: {}", e.message.as_deref().unwrap_or("?"))
            }
            EventKind::ShutdownRequested => "shutdown requested by operator".to_string(),
            EventKind::SupervisorStopped => "supervisor stopped".to_string(),
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, event: &Event) {
        let ts: DateTime<Local> = event.at.into();
        let line = format!(
            "{} [{:5}] {}",
            ts.format("%Y-%m-%d %H:%M:%S"),
            event.level().as_str(),
            Self::render(event)
        );
        match event.level() {
            Level::Info => println!("{line}"),
            Level::Warn | Level::Error => eprintln!("{line}"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
