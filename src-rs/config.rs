use std::env;
use std::time::Duration;

use tracing::{info, warn};

use crate::task::DEFAULT_SHARDS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    pub port: u16,
    pub log_level: String,
    pub task_duration: Duration,
    pub shutdown_timeout: Duration,
    pub shard_count: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            task_duration: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
            shard_count: DEFAULT_SHARDS,
        }
    }
}

impl TrackerConfig {
    /// Reads `PORT`, `LOG_LEVEL`, `TASK_DURATION`, `SHUTDOWN_TIMEOUT` (both in
    /// whole seconds) and `TASK_SHARDS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: lookup("LOG_LEVEL")
                .map(|value| value.trim().to_lowercase())
                .unwrap_or(defaults.log_level),
            task_duration: Duration::from_secs(parse_or(
                &lookup,
                "TASK_DURATION",
                defaults.task_duration.as_secs(),
            )),
            shutdown_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SHUTDOWN_TIMEOUT",
                defaults.shutdown_timeout.as_secs(),
            )),
            shard_count: match parse_or(&lookup, "TASK_SHARDS", defaults.shard_count) {
                0 => {
                    warn!(key = "TASK_SHARDS", "must be at least 1, using default");
                    defaults.shard_count
                }
                count => count,
            },
        }
    }

    pub fn log_summary(&self) {
        info!(
            port = self.port,
            log_level = %self.log_level,
            task_duration = ?self.task_duration,
            shutdown_timeout = ?self.shutdown_timeout,
            shards = self.shard_count,
            "configuration loaded"
        );
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, fallback: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = ?fallback, "invalid value, using default");
                fallback
            }
        },
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = TrackerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(cfg, TrackerConfig::default());
    }

    #[test]
    fn reads_all_keys() {
        let cfg = TrackerConfig::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("LOG_LEVEL", "DEBUG"),
            ("TASK_DURATION", "3"),
            ("SHUTDOWN_TIMEOUT", "10"),
            ("TASK_SHARDS", "32"),
        ]));
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.task_duration, Duration::from_secs(3));
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(cfg.shard_count, 32);
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = TrackerConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("LOG_LEVEL", "   "),
            ("TASK_DURATION", "1.5"),
            ("TASK_SHARDS", "0"),
        ]));
        assert_eq!(cfg, TrackerConfig::default());
    }
}
