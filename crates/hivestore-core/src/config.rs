//! Configuration for HiveStore
//!
//! All tunables in one place: how large a single host property chunk may be,
//! how long a lock waiter is allowed to spin, and the tick interval between
//! re-checks while waiting.

use std::time::Duration;

/// HiveStore configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum serialized payload bytes per chunk property
    pub chunk_size: usize,
    /// Upper bound on cumulative lock wait before LockTimeout
    pub lock_timeout: Duration,
    /// Tick interval between lock re-checks while waiting
    pub lock_poll_interval: Duration,
}

impl Config {
    /// Defaults matching the host's dynamic-property limits:
    /// 30000-byte chunks, 10 second lock bound, 50 ms tick.
    pub fn new() -> Self {
        Self {
            chunk_size: 30_000,
            lock_timeout: Duration::from_secs(10),
            lock_poll_interval: Duration::from_millis(50),
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".into());
        }
        if self.chunk_size > 32_767 {
            return Err("chunk_size must fit the host's scalar value limit (<= 32767)".into());
        }
        if self.lock_timeout.is_zero() {
            return Err("lock_timeout must be > 0".into());
        }
        if self.lock_poll_interval.is_zero() {
            return Err("lock_poll_interval must be > 0".into());
        }
        if self.lock_poll_interval > self.lock_timeout {
            return Err("lock_poll_interval must not exceed lock_timeout".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(Config::default().chunk_size, 30_000);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_poll_longer_than_timeout() {
        let mut config = Config::default();
        config.lock_poll_interval = Duration::from_secs(20);
        assert!(config.validate().is_err());
    }
}
