//! # Event subscribers for the supervision runtime.
//!
//! Provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out, and the
//! built-in [`LogWriter`] sink.
//!
//! ```text
//! Event flow:
//!   Controller ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter  Metrics   Custom
//! ```
//!
//! Subscribers run in isolation: each gets a bounded queue and a dedicated
//! worker task, so a slow sink never blocks the controller loop.

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
