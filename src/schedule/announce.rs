//! # Announcement rules and reboot plans.
//!
//! An [`AnnouncementRule`] is a configured warning fired a fixed offset before
//! the reboot instant, with the offset expressed as either whole minutes or
//! whole seconds (mutually exclusive). The message template may contain a
//! `{minutes}` or `{seconds}` placeholder substituted with the rule's count.
//!
//! [`RebootPlan::build`] expands a target instant plus the rule set into the
//! ordered announcement ladder:
//!
//! ```text
//! rules = [{minutes_before: 5, "{minutes}m"}, {seconds_before: 10, "{seconds}s"}]
//! target = T
//!   ──► [(T − 5m, "5m"), (T − 10s, "10s")]
//! ```
//!
//! Rules whose fire instant has already elapsed when the plan is built are
//! skipped, not fired late: a supervisor started mid-window announces only
//! what is still ahead.

use chrono::{Duration as TimeDelta, NaiveDateTime};
use serde::Deserialize;

/// A configured warning fired a fixed offset before the reboot instant.
///
/// Exactly one of `minutes_before`/`seconds_before` must be set and positive;
/// configuration validation enforces this.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementRule {
    /// Offset before the reboot instant, in whole minutes.
    #[serde(default)]
    pub minutes_before: Option<u64>,
    /// Offset before the reboot instant, in whole seconds.
    #[serde(default)]
    pub seconds_before: Option<u64>,
    /// Message template; `{minutes}`/`{seconds}` is replaced with the count.
    pub message: String,
}

impl AnnouncementRule {
    /// Creates a minutes-based rule.
    pub fn minutes(minutes: u64, message: impl Into<String>) -> Self {
        Self {
            minutes_before: Some(minutes),
            seconds_before: None,
            message: message.into(),
        }
    }

    /// Creates a seconds-based rule.
    pub fn seconds(seconds: u64, message: impl Into<String>) -> Self {
        Self {
            minutes_before: None,
            seconds_before: Some(seconds),
            message: message.into(),
        }
    }

    /// Offset before the reboot instant, in seconds.
    ///
    /// Returns `None` for a rule carrying neither unit (rejected by config
    /// validation, tolerated here by skipping the rule).
    pub fn offset_seconds(&self) -> Option<u64> {
        match (self.seconds_before, self.minutes_before) {
            (Some(s), _) => Some(s),
            (None, Some(m)) => Some(m * 60),
            (None, None) => None,
        }
    }

    /// Renders the message, substituting the unit placeholder with the count.
    ///
    /// A template without the placeholder is used verbatim.
    pub fn render(&self) -> String {
        if let Some(s) = self.seconds_before {
            self.message.replace("{seconds}", &s.to_string())
        } else if let Some(m) = self.minutes_before {
            self.message.replace("{minutes}", &m.to_string())
        } else {
            self.message.clone()
        }
    }
}

/// One scheduled announcement: a fire instant and its rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// When to write the announcement command.
    pub fire_at: NaiveDateTime,
    /// Rendered message text (placeholder already substituted).
    pub message: String,
}

/// A reboot instant plus its ordered announcement ladder.
///
/// Derived fresh each cycle; after a crash mid-window the controller reuses
/// the plan against the new process instance via [`RebootPlan::refreshed`].
#[derive(Debug, Clone)]
pub struct RebootPlan {
    /// The absolute scheduled reboot instant.
    pub target: NaiveDateTime,
    /// Announcements, strictly increasing in `fire_at` (stable for ties),
    /// all strictly before `target`.
    pub announcements: Vec<Announcement>,
}

impl RebootPlan {
    /// Expands `rules` against `target`, skipping anything already in the past.
    ///
    /// A rule is included iff `target − offset` is strictly after `now` and
    /// strictly before `target` (offset > 0). The result is sorted ascending
    /// by fire instant; ties preserve input rule order.
    pub fn build(now: NaiveDateTime, target: NaiveDateTime, rules: &[AnnouncementRule]) -> Self {
        let mut announcements: Vec<Announcement> = rules
            .iter()
            .filter_map(|rule| {
                let offset = rule.offset_seconds()?;
                if offset == 0 {
                    return None;
                }
                let fire_at = target - TimeDelta::seconds(offset as i64);
                if fire_at <= now {
                    return None;
                }
                Some(Announcement {
                    fire_at,
                    message: rule.render(),
                })
            })
            .collect();

        announcements.sort_by_key(|a| a.fire_at);
        Self {
            target,
            announcements,
        }
    }

    /// Returns a copy with announcements already elapsed at `now` dropped.
    ///
    /// Used when a crashed process is relaunched mid-window: the target stays
    /// unchanged, only the remaining ladder is kept.
    pub fn refreshed(&self, now: NaiveDateTime) -> Self {
        Self {
            target: self.target,
            announcements: self
                .announcements
                .iter()
                .filter(|a| a.fire_at > now)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 26)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn minutes_placeholder_renders_count() {
        let rule = AnnouncementRule::minutes(10, "reboot in {minutes} minutes");
        assert_eq!(rule.render(), "reboot in 10 minutes");
    }

    #[test]
    fn literal_message_is_untouched() {
        let rule = AnnouncementRule::seconds(30, "server rebooting soon");
        assert_eq!(rule.render(), "server rebooting soon");
    }

    #[test]
    fn ladder_is_sorted_and_strictly_before_target() {
        let target = t(12, 0, 0);
        let rules = vec![
            AnnouncementRule::minutes(5, "{minutes}m"),
            AnnouncementRule::seconds(10, "{seconds}s"),
        ];
        let plan = RebootPlan::build(t(11, 0, 0), target, &rules);

        assert_eq!(plan.announcements.len(), 2);
        assert_eq!(plan.announcements[0].fire_at, t(11, 55, 0));
        assert_eq!(plan.announcements[0].message, "5m");
        assert_eq!(plan.announcements[1].fire_at, t(11, 59, 50));
        assert_eq!(plan.announcements[1].message, "10s");
        for a in &plan.announcements {
            assert!(a.fire_at < plan.target);
        }
    }

    #[test]
    fn elapsed_rules_are_skipped_not_fired_late() {
        // Started mid-window: the 30-minute warning is already in the past.
        let target = t(12, 0, 0);
        let rules = vec![
            AnnouncementRule::minutes(30, "{minutes}m"),
            AnnouncementRule::minutes(5, "{minutes}m"),
        ];
        let plan = RebootPlan::build(t(11, 45, 0), target, &rules);

        assert_eq!(plan.announcements.len(), 1);
        assert_eq!(plan.announcements[0].message, "5m");
    }

    #[test]
    fn equal_fire_instants_preserve_rule_order() {
        let target = t(12, 0, 0);
        let rules = vec![
            AnnouncementRule::minutes(1, "first"),
            AnnouncementRule::seconds(60, "second"),
        ];
        let plan = RebootPlan::build(t(11, 0, 0), target, &rules);

        assert_eq!(plan.announcements[0].message, "first");
        assert_eq!(plan.announcements[1].message, "second");
    }

    #[test]
    fn zero_and_unitless_rules_are_dropped() {
        let target = t(12, 0, 0);
        let rules = vec![
            AnnouncementRule::minutes(0, "never"),
            AnnouncementRule {
                minutes_before: None,
                seconds_before: None,
                message: "no unit".into(),
            },
        ];
        let plan = RebootPlan::build(t(11, 0, 0), target, &rules);
        assert!(plan.announcements.is_empty());
    }

    #[test]
    fn refreshed_drops_elapsed_announcements_and_keeps_target() {
        let target = t(12, 0, 0);
        let rules = vec![
            AnnouncementRule::minutes(30, "{minutes}m"),
            AnnouncementRule::minutes(5, "{minutes}m"),
        ];
        let plan = RebootPlan::build(t(11, 0, 0), target, &rules);
        assert_eq!(plan.announcements.len(), 2);

        // Crash at 11:40, relaunch: only the 5-minute warning remains.
        let reused = plan.refreshed(t(11, 40, 0));
        assert_eq!(reused.target, target);
        assert_eq!(reused.announcements.len(), 1);
        assert_eq!(reused.announcements[0].fire_at, t(11, 55, 0));
    }
}
