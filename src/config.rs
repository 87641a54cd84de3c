//! Runtime settings for the checker and the bot.

use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::check::{MAX_CONCURRENT_REQUESTS, REQUEST_TIMEOUT, USER_AGENT};
use crate::error::ConfigError;

/// Checker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a successful lookup stays cached.
    pub cache_ttl: Duration,
    /// Deadline for each outbound request.
    pub request_timeout: Duration,
    /// Upper bound on lookups in flight during a full scan.
    pub max_concurrent: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            request_timeout: REQUEST_TIMEOUT,
            max_concurrent: MAX_CONCURRENT_REQUESTS,
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

impl Config {
    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.user_agent.starts_with("handle-avail/"));
    }

    #[test]
    fn zero_values_rejected() {
        let config = Config {
            cache_ttl: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTtl));

        let config = Config {
            request_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let config = Config {
            max_concurrent: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }
}
