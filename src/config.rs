//! Environment-driven configuration, read once at startup.
//!
//! Follows the `Config::from_env` convention used across the agent-platform
//! examples: every field has a default, env vars are optional overrides, and
//! nothing is read more than once per process lifetime.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:3000".parse().expect("default bind addr is valid")
}

fn default_max_concurrent_tasks() -> usize {
    4
}

fn default_event_retention_days() -> u64 {
    7
}

fn default_task_ttl_days() -> u64 {
    7
}

fn default_tail_block_ms() -> u64 {
    1000
}

/// Process-wide settings, built once by [`Config::from_env`] and never
/// mutated afterward.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_concurrent_tasks: usize,
    pub event_retention_days: u64,
    pub task_ttl_days: u64,
    pub tail_block: Duration,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset. Fails only if a set variable is present
    /// but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        let bind_addr = match std::env::var("RESEARCH_BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::invalid_params(format!("invalid RESEARCH_BIND_ADDR: {raw:?}")))?,
            Err(_) => default_bind_addr(),
        };

        let max_concurrent_tasks = parse_env_or(
            "RESEARCH_MAX_CONCURRENT_TASKS",
            default_max_concurrent_tasks(),
        )?;
        let event_retention_days = parse_env_or(
            "RESEARCH_EVENT_RETENTION_DAYS",
            default_event_retention_days(),
        )?;
        let task_ttl_days = parse_env_or("RESEARCH_TASK_TTL_DAYS", default_task_ttl_days())?;
        let tail_block_ms = parse_env_or("RESEARCH_TAIL_BLOCK_MS", default_tail_block_ms())?;

        Ok(Self {
            bind_addr,
            max_concurrent_tasks,
            event_retention_days,
            task_ttl_days,
            tail_block: Duration::from_millis(tail_block_ms),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            event_retention_days: default_event_retention_days(),
            task_ttl_days: default_task_ttl_days(),
            tail_block: Duration::from_millis(default_tail_block_ms()),
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, AppError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::invalid_params(format!("invalid {var}: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.bind_addr, default_bind_addr());
        assert_eq!(config.max_concurrent_tasks, 4);
        assert_eq!(config.event_retention_days, 7);
        assert_eq!(config.task_ttl_days, 7);
        assert_eq!(config.tail_block, Duration::from_millis(1000));
    }

    #[test]
    fn parse_env_or_falls_back_on_missing() {
        std::env::remove_var("TASKSTREAM_TEST_UNSET_VAR");
        let value: u64 = parse_env_or("TASKSTREAM_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_env_or_rejects_malformed_value() {
        std::env::set_var("TASKSTREAM_TEST_BAD_VAR", "not-a-number");
        let result: Result<u64, AppError> = parse_env_or("TASKSTREAM_TEST_BAD_VAR", 42);
        std::env::remove_var("TASKSTREAM_TEST_BAD_VAR");
        assert!(result.is_err());
    }
}
