//! # Daily reboot schedule calculation.
//!
//! A schedule is a list of [`ScheduleEntry`]s, each naming a local time of day.
//! [`next_reboot`] picks the earliest enabled slot strictly after "now",
//! rolling over to tomorrow for slots that have already passed today.

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::Deserialize;

/// One daily reboot slot.
///
/// Loaded once from configuration and immutable afterwards. Disabled entries
/// are kept in the list but excluded from next-reboot computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScheduleEntry {
    /// Hour of day, 0–23.
    pub hour: u8,
    /// Minute, 0–59.
    pub minute: u8,
    /// Whether this slot participates in scheduling (default: true).
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl ScheduleEntry {
    /// Creates an enabled entry at the given local time of day.
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            hour,
            minute,
            enabled: true,
        }
    }

    /// True if hour and minute are within range.
    pub fn is_valid(&self) -> bool {
        self.hour <= 23 && self.minute <= 59
    }
}

/// Computes the next reboot instant strictly after `now`.
///
/// For each enabled entry, today's candidate at (hour, minute) is eligible if
/// it is strictly after `now`; otherwise tomorrow's candidate is used. The
/// result is the minimum eligible candidate.
///
/// Returns `None` iff `entries` contains no enabled items; the caller must
/// then run without a reboot cycle (restart-on-exit only). Entries with an
/// out-of-range time are skipped; configuration validation rejects them
/// before they get here.
///
/// Duplicate times are harmless: they produce the identical instant and the
/// reboot fires once.
pub fn next_reboot(now: NaiveDateTime, entries: &[ScheduleEntry]) -> Option<NaiveDateTime> {
    let mut best: Option<NaiveDateTime> = None;

    for entry in entries.iter().filter(|e| e.enabled) {
        let Some(time) = NaiveTime::from_hms_opt(u32::from(entry.hour), u32::from(entry.minute), 0)
        else {
            continue;
        };

        let today = now.date().and_time(time);
        let candidate = if today > now {
            today
        } else {
            (now.date() + Days::new(1)).and_time(time)
        };

        best = Some(match best {
            Some(current) if current <= candidate => current,
            _ => candidate,
        });
    }

    best
}
