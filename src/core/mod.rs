//! Runtime core: the reboot-cycle controller and shutdown signal handling.
//!
//! The only public API from this module is [`Controller`], which owns the
//! supervised process slot, drives the schedule and announcement timers,
//! executes the shutdown protocol at the reboot instant, and relaunches the
//! server after exits, scheduled or not.
//!
//! Internal modules:
//! - [`controller`]: the cycle state machine;
//! - [`shutdown`]: cross-platform operator-signal handling.

mod controller;
mod shutdown;

pub use controller::Controller;
