//! # Runtime configuration.
//!
//! [`Config`] bundles everything the controller needs: the server command
//! line, the daily reboot schedule, the announcement ladder, and the timing
//! knobs of the shutdown protocol.
//!
//! The operator-facing shape is a JSON file (`reboot_config.json`):
//!
//! ```json
//! {
//!   "server_path": "/srv/game/Server",
//!   "server_args": [],
//!   "reboot_schedule": [
//!     { "hour": 4, "minute": 0 },
//!     { "hour": 12, "minute": 0, "enabled": false }
//!   ],
//!   "announcement_intervals": [
//!     { "minutes_before": 5, "message": "reboot in {minutes} minutes" },
//!     { "seconds_before": 10, "message": "reboot in {seconds} seconds" }
//!   ],
//!   "restart_delay_seconds": 10,
//!   "exit_grace_seconds": 60
//! }
//! ```
//!
//! Loading is fail-fast: a missing/unreadable `server_path`, an out-of-range
//! schedule entry, or an announcement rule with both or neither offset unit
//! rejects the whole config before anything is launched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;
use crate::schedule::{AnnouncementRule, ScheduleEntry};

/// Default grace period after the `exit` command before forced termination.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(60);
/// Bound on the best-effort graceful shutdown when the operator stops the supervisor.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);
/// How long to wait for the exit to be observed after a kill signal.
pub const DEFAULT_KILL_CONFIRM: Duration = Duration::from_secs(5);
/// Default event bus ring buffer size.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// On-disk JSON shape. Converted into [`Config`] after validation.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    server_path: PathBuf,
    #[serde(default)]
    server_args: Vec<String>,
    #[serde(default)]
    reboot_schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    announcement_intervals: Vec<AnnouncementRule>,
    restart_delay_seconds: u64,
    #[serde(default = "default_exit_grace_seconds")]
    exit_grace_seconds: u64,
}

fn default_exit_grace_seconds() -> u64 {
    DEFAULT_EXIT_GRACE.as_secs()
}

/// Validated runtime configuration for the supervisor.
///
/// All fields are public; [`Config::from_file`] is the normal entry point and
/// guarantees the invariants (valid schedule ranges, well-formed announcement
/// rules, readable server path).
#[derive(Debug, Clone)]
pub struct Config {
    /// Server executable. Its parent directory becomes the working directory.
    pub server_path: PathBuf,
    /// Arguments passed to the server.
    pub server_args: Vec<String>,
    /// Daily reboot slots.
    pub schedule: Vec<ScheduleEntry>,
    /// Countdown announcement rules.
    pub announcements: Vec<AnnouncementRule>,
    /// Pause between process exit and relaunch (also applied after crashes).
    pub restart_delay: Duration,
    /// Grace period after the `exit` command before forced termination.
    pub exit_grace: Duration,
    /// Bound on graceful shutdown when the operator stops the supervisor.
    pub stop_grace: Duration,
    /// Wait for exit confirmation after a kill signal.
    pub kill_confirm: Duration,
    /// Event bus ring buffer size.
    pub bus_capacity: usize,
    /// Delay policy for retrying failed launches (after the first success).
    pub launch_backoff: BackoffPolicy,
}

impl Config {
    /// Loads and validates a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let cfg = Self {
            server_path: file.server_path,
            server_args: file.server_args,
            schedule: file.reboot_schedule,
            announcements: file.announcement_intervals,
            restart_delay: Duration::from_secs(file.restart_delay_seconds),
            exit_grace: Duration::from_secs(file.exit_grace_seconds),
            stop_grace: DEFAULT_STOP_GRACE,
            kill_confirm: DEFAULT_KILL_CONFIRM,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            launch_backoff: BackoffPolicy::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks invariants the rest of the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if std::fs::metadata(&self.server_path).is_err() {
            return Err(ConfigError::ServerPath {
                path: self.server_path.clone(),
            });
        }

        for entry in &self.schedule {
            if !entry.is_valid() {
                return Err(ConfigError::ScheduleRange {
                    hour: entry.hour,
                    minute: entry.minute,
                });
            }
        }

        for rule in &self.announcements {
            match (rule.minutes_before, rule.seconds_before) {
                (Some(_), Some(_)) | (None, None) => {
                    return Err(ConfigError::AmbiguousOffset {
                        message: rule.message.clone(),
                    });
                }
                (Some(0), None) | (None, Some(0)) => {
                    return Err(ConfigError::ZeroOffset {
                        message: rule.message.clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn server_file() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_a_full_config() {
        let server = server_file();
        let json = format!(
            r#"{{
                "server_path": {:?},
                "server_args": ["--port", "5400"],
                "reboot_schedule": [
                    {{ "hour": 4, "minute": 0 }},
                    {{ "hour": 12, "minute": 0, "enabled": false }}
                ],
                "announcement_intervals": [
                    {{ "minutes_before": 5, "message": "reboot in {{minutes}} minutes" }},
                    {{ "seconds_before": 10, "message": "reboot in {{seconds}} seconds" }}
                ],
                "restart_delay_seconds": 10
            }}"#,
            server.path()
        );
        let file = write_config(&json);

        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg.server_args, vec!["--port", "5400"]);
        assert_eq!(cfg.schedule.len(), 2);
        assert!(!cfg.schedule[1].enabled);
        assert_eq!(cfg.announcements.len(), 2);
        assert_eq!(cfg.restart_delay, Duration::from_secs(10));
        assert_eq!(cfg.exit_grace, DEFAULT_EXIT_GRACE);
    }

    #[test]
    fn rejects_missing_server_path() {
        let json = r#"{
            "server_path": "/nonexistent/server",
            "restart_delay_seconds": 5
        }"#;
        let file = write_config(json);
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ServerPath { .. }));
    }

    #[test]
    fn rejects_out_of_range_schedule() {
        let server = server_file();
        let json = format!(
            r#"{{
                "server_path": {:?},
                "reboot_schedule": [{{ "hour": 24, "minute": 0 }}],
                "restart_delay_seconds": 5
            }}"#,
            server.path()
        );
        let file = write_config(&json);
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ScheduleRange { hour: 24, .. }));
    }

    #[test]
    fn rejects_rule_with_both_units() {
        let server = server_file();
        let json = format!(
            r#"{{
                "server_path": {:?},
                "announcement_intervals": [
                    {{ "minutes_before": 5, "seconds_before": 30, "message": "soon" }}
                ],
                "restart_delay_seconds": 5
            }}"#,
            server.path()
        );
        let file = write_config(&json);
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousOffset { .. }));
    }

    #[test]
    fn rejects_zero_offset_rule() {
        let server = server_file();
        let json = format!(
            r#"{{
                "server_path": {:?},
                "announcement_intervals": [
                    {{ "seconds_before": 0, "message": "now" }}
                ],
                "restart_delay_seconds": 5
            }}"#,
            server.path()
        );
        let file = write_config(&json);
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroOffset { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let file = write_config("{ not json");
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
