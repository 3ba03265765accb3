//! Request throttling
//!
//! A direct (unkeyed) governor token bucket shared by every request a
//! client sends.

use governor::{DefaultDirectRateLimiter, Quota};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token bucket settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed back to back before throttling starts
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

impl RateLimiterConfig {
    /// Create a rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// Governor quota; zero values are raised to one
    fn quota(&self) -> Quota {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    /// Create a limiter from `config`
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            bucket: Arc::new(DefaultDirectRateLimiter::direct(config.quota())),
        }
    }

    /// Wait for a token
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a token if one is available
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_partial_yaml() {
        let config: RateLimiterConfig = serde_yaml::from_str("requests_per_second: 2").unwrap();
        assert_eq!(config, RateLimiterConfig::new(2, 10));
    }

    #[tokio::test]
    async fn test_burst_then_throttled() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 5));

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_zero_rate_is_clamped() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_shared_between_clones() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 1));
        let clone = limiter.clone();

        clone.wait().await;
        assert!(!limiter.try_acquire());
    }
}
