//! # Reboot schedule and announcement planning.
//!
//! Two pure building blocks, both free of I/O so they are trivially testable:
//!
//! - [`next_reboot`]: maps "now" plus a set of daily [`ScheduleEntry`]s to the
//!   next future reboot instant.
//! - [`RebootPlan`]: expands a reboot instant plus a set of
//!   [`AnnouncementRule`]s into the ordered ladder of (fire instant, rendered
//!   message) pairs the controller walks through.
//!
//! All calendar arithmetic is done on [`chrono::NaiveDateTime`] in the local
//! timezone; the controller converts wall-clock gaps to `std::time::Duration`
//! only at the point of sleeping.

mod announce;
mod calendar;

pub use announce::{Announcement, AnnouncementRule, RebootPlan};
pub use calendar::{next_reboot, ScheduleEntry};
