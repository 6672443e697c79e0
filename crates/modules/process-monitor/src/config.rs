use std::num::NonZeroUsize;

use serde::Deserialize;
use thiserror::Error;

/// Capacity of the process cache store.
pub const DEFAULT_PROC_CACHE_CAPACITY: usize = 4095;
/// Capacity of the pid-to-cookie index. Slightly larger than the store:
/// fork aliasing means the index holds more keys than the store.
pub const DEFAULT_PID_COOKIE_CAPACITY: usize = 4097;
/// Capacity of the per-thread pending-syscall slot table.
pub const DEFAULT_SYSCALL_SLOTS: usize = 1024;
/// Lock shards per table.
pub const DEFAULT_LOCK_SHARDS: usize = 8;

/// Sizing of the engine's bounded tables.
///
/// Capacities bound memory, not correctness: a table under pressure evicts
/// its least-recently-used entries, and every consumer treats the
/// resulting misses as normal.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub proc_cache_capacity: usize,
    pub pid_cookie_capacity: usize,
    pub syscall_slots: usize,
    pub lock_shards: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_cache_capacity: DEFAULT_PROC_CACHE_CAPACITY,
            pid_cookie_capacity: DEFAULT_PID_COOKIE_CAPACITY,
            syscall_slots: DEFAULT_SYSCALL_SLOTS,
            lock_shards: DEFAULT_LOCK_SHARDS,
        }
    }
}

/// Rejected configuration. Raised once, at engine construction: a bad
/// config is a deployment error, never a runtime fault.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroCapacity { name: &'static str },
}

pub(crate) fn capacity(value: usize, name: &'static str) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::ZeroCapacity { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.proc_cache_capacity, 4095);
        assert_eq!(config.pid_cookie_capacity, 4097);
        assert_eq!(config.syscall_slots, 1024);
        assert_eq!(config.lock_shards, 8);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: Config = serde_json::from_str(r#"{ "proc_cache_capacity": 128 }"#).unwrap();
        assert_eq!(config.proc_cache_capacity, 128);
        assert_eq!(config.pid_cookie_capacity, DEFAULT_PID_COOKIE_CAPACITY);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "proc_cache": 128 }"#).is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(capacity(0, "proc_cache").is_err());
        assert_eq!(capacity(4095, "proc_cache").unwrap().get(), 4095);
    }
}
