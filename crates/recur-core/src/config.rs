//! Runtime configuration read from the environment.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::recurrence::DEFAULT_PREVIEW_LIMIT;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurConfig {
    /// How often the trigger runs a pass.
    pub poll_interval: Duration,
    /// Concurrent trigger workers in one process.
    pub workers: usize,
    /// Preview cap for rules without an `After` count.
    pub preview_limit: usize,
    pub database_url: Option<String>,
}

impl Default for RecurConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            workers: 1,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            database_url: None,
        }
    }
}

impl RecurConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// - `RECUR_POLL_INTERVAL_SECS` (60)
    /// - `RECUR_WORKERS` (1)
    /// - `RECUR_PREVIEW_LIMIT` (100)
    /// - `DATABASE_URL` (unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_secs(env_parse(
                "RECUR_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )),
            workers: env_parse("RECUR_WORKERS", defaults.workers).max(1),
            preview_limit: env_parse("RECUR_PREVIEW_LIMIT", defaults.preview_limit),
            database_url: env_opt("DATABASE_URL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RecurConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.workers, 1);
        assert_eq!(config.preview_limit, 100);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn unparsable_values_fall_back() {
        const KEY: &str = "RECUR_TEST_NOT_A_NUMBER_4b1e";
        // SAFETY: key is unique to this test; nothing else reads it.
        unsafe { env::set_var(KEY, "sixty") };
        assert_eq!(env_parse(KEY, 7u64), 7);
        assert_eq!(env_opt(KEY).as_deref(), Some("sixty"));
        unsafe { env::remove_var(KEY) };
    }

    #[test]
    fn empty_and_unset_values_fall_back() {
        const KEY: &str = "RECUR_TEST_EMPTY_VALUE_7d3a";
        // SAFETY: key is unique to this test; nothing else reads it.
        unsafe { env::set_var(KEY, "") };
        assert_eq!(env_opt(KEY), None);
        assert_eq!(env_parse(KEY, 3usize), 3);
        unsafe { env::remove_var(KEY) };
        assert_eq!(env_parse(KEY, 5usize), 5);
    }
}
