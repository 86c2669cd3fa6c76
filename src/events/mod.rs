//! # Lifecycle events emitted by the supervision runtime.
//!
//! The runtime reports everything it does (launches, announcements, exits,
//! escalations) as [`Event`]s published on a [`Bus`]. Subscribers consume the
//! stream for logging, metrics, or alerting; the built-in
//! [`LogWriter`](crate::LogWriter) is one such consumer.
//!
//! No failure path is silent: every error the runtime swallows (a broken stdin
//! pipe, a launch retry) still produces an event.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Level};
