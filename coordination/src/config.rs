//! Engine configuration.
//!
//! The store location and lock behaviour are carried explicitly through the
//! engine; nothing reads the environment after construction.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "TEAM_TASKS_DIR";
/// Environment variable overriding the lock wait bound, in milliseconds.
pub const ENV_LOCK_TIMEOUT_MS: &str = "TEAM_TASKS_LOCK_TIMEOUT_MS";
/// Environment variable toggling the `.json.backup` copy on save.
pub const ENV_KEEP_BACKUPS: &str = "TEAM_TASKS_KEEP_BACKUPS";

/// Configuration for [`crate::Engine`] and [`crate::store::ProjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding one `<name>.json` record per project
    pub data_dir: PathBuf,
    /// Upper bound on waiting for a project lock
    pub lock_timeout: Duration,
    /// Sleep between non-blocking lock attempts
    pub lock_poll_interval: Duration,
    /// Copy the previous record to `<name>.json.backup` before each save
    pub keep_backups: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lock_timeout: Duration::from_millis(5_000),
            lock_poll_interval: Duration::from_millis(50),
            keep_backups: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("data")
        .join("team-tasks")
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

impl EngineConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparsable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup(ENV_LOCK_TIMEOUT_MS) {
            if let Ok(ms) = ms.trim().parse::<u64>() {
                config.lock_timeout = Duration::from_millis(ms);
            }
        }
        if let Some(val) = lookup(ENV_KEEP_BACKUPS) {
            config.keep_backups = parse_flag(&val);
        }

        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    pub fn with_keep_backups(mut self, keep: bool) -> Self {
        self.keep_backups = keep;
        self
    }
}
