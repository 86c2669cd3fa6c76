//! # Child process ownership: launch, stdin commands, exit, termination.
//!
//! [`ProcessSupervisor`] owns the single child-process slot of the runtime:
//! it launches the server, primes and writes to its stdin, polls liveness,
//! waits for exit, and escalates to forced termination when asked.
//!
//! A [`SupervisedProcess`] handle is created per launch and invalidated once
//! its exit is observed; it is never reused across launches.

mod supervisor;

pub use supervisor::{ProcessStatus, ProcessSupervisor, SupervisedProcess, WaitOutcome};
