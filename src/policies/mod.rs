//! # Retry policies.
//!
//! Provides [`BackoffPolicy`], which controls the delay between repeated
//! launch attempts when the server fails to spawn after the initial
//! successful launch.

mod backoff;

pub use backoff::BackoffPolicy;
