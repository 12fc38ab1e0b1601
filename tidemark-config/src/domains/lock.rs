//! Distributed lock configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tidemark_resilience::BackoffStrategy;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// Distributed lock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Wrap runs in the distributed lock
    #[serde(default = "crate::domains::utils::default_false")]
    pub enabled: bool,

    /// How long to keep trying to acquire the lock. Also the lock record TTL.
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_lock_timeout")]
    pub timeout: Duration,

    /// Delay between acquisition attempts
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_retry_interval")]
    pub retry_interval: Duration,

    /// How the delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_lock_timeout(),
            retry_interval: default_retry_interval(),
            backoff: BackoffStrategy::Fixed,
        }
    }
}

impl Validatable for LockConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        validate_positive(self.retry_interval.as_secs(), "retry_interval", self.domain_name())?;

        if self.retry_interval > self.timeout {
            log::warn!(
                "lock.retry_interval ({:?}) exceeds lock.timeout ({:?}); only one attempt will be made",
                self.retry_interval,
                self.timeout
            );
        }

        if let BackoffStrategy::Exponential { base } = self.backoff {
            if base < 1.0 {
                return Err(self.validation_error(format!(
                    "exponential backoff base must be at least 1.0, got {}",
                    base
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "lock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LockConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.backoff, BackoffStrategy::Fixed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LockConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shrinking_backoff_rejected() {
        let config = LockConfig {
            backoff: BackoffStrategy::Exponential { base: 0.5 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
