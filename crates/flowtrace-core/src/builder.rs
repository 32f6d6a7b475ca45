use crate::config::TraceConfig;
use crate::constants::MAX_TTL;
use crate::error::{TraceError, TraceResult};
use crate::types::TimeToLive;
use std::time::Duration;

/// A builder for creating a validated [`TraceConfig`].
///
/// # Examples
///
/// Basic usage:
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use flowtrace_core::Builder;
/// use std::time::Duration;
///
/// let config = Builder::new()
///     .ttl_max(30)
///     .ttl_repeat_max(2)
///     .mangle_freq(4)
///     .response_timeout(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Builder {
    ttl_max: u8,
    ttl_repeat_max: usize,
    mangle_freq: usize,
    response_timeout: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        let config = TraceConfig::default();
        Self {
            ttl_max: config.ttl_max.0,
            ttl_repeat_max: config.ttl_repeat_max,
            mangle_freq: config.mangle_freq,
            response_timeout: config.response_timeout,
        }
    }
}

impl Builder {
    /// Initialize a new `Builder` with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum time-to-live to probe (inclusive).
    #[must_use]
    pub const fn ttl_max(mut self, ttl_max: u8) -> Self {
        self.ttl_max = ttl_max;
        self
    }

    /// Set the number of probes to send at each time-to-live.
    #[must_use]
    pub const fn ttl_repeat_max(mut self, ttl_repeat_max: usize) -> Self {
        self.ttl_repeat_max = ttl_repeat_max;
        self
    }

    /// Set the probe pacing: only every N-th packet of the flow is a
    /// candidate for mangling.
    #[must_use]
    pub const fn mangle_freq(mut self, mangle_freq: usize) -> Self {
        self.mangle_freq = mangle_freq;
        self
    }

    /// Set how long to wait for replies before advancing to the next hop.
    #[must_use]
    pub const fn response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Validate the configuration and build a [`TraceConfig`].
    pub fn build(self) -> TraceResult<TraceConfig> {
        if self.ttl_max == 0 {
            return Err(TraceError::BadConfig(String::from(
                "ttl_max must be at least 1",
            )));
        }
        if self.ttl_max > MAX_TTL {
            return Err(TraceError::BadConfig(format!(
                "ttl_max must be at most {MAX_TTL}"
            )));
        }
        if self.ttl_repeat_max == 0 {
            return Err(TraceError::BadConfig(String::from(
                "ttl_repeat_max must be at least 1",
            )));
        }
        if self.mangle_freq == 0 {
            return Err(TraceError::BadConfig(String::from(
                "mangle_freq must be at least 1",
            )));
        }
        if self.response_timeout.is_zero() {
            return Err(TraceError::BadConfig(String::from(
                "response_timeout must be non-zero",
            )));
        }
        Ok(TraceConfig {
            ttl_max: TimeToLive(self.ttl_max),
            ttl_repeat_max: self.ttl_repeat_max,
            mangle_freq: self.mangle_freq,
            response_timeout: self.response_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;

    #[test]
    fn test_build_default() -> anyhow::Result<()> {
        let config = Builder::new().build()?;
        assert_eq!(TimeToLive(defaults::DEFAULT_TTL_MAX), config.ttl_max);
        assert_eq!(defaults::DEFAULT_TTL_REPEAT_MAX, config.ttl_repeat_max);
        assert_eq!(defaults::DEFAULT_MANGLE_FREQ, config.mangle_freq);
        assert_eq!(defaults::DEFAULT_RESPONSE_TIMEOUT, config.response_timeout);
        Ok(())
    }

    #[test]
    fn test_build_custom() -> anyhow::Result<()> {
        let config = Builder::new()
            .ttl_max(3)
            .ttl_repeat_max(2)
            .mangle_freq(1)
            .response_timeout(Duration::from_millis(50))
            .build()?;
        assert_eq!(TimeToLive(3), config.ttl_max);
        assert_eq!(2, config.ttl_repeat_max);
        assert_eq!(1, config.mangle_freq);
        assert_eq!(Duration::from_millis(50), config.response_timeout);
        Ok(())
    }

    #[test]
    fn test_build_zero_ttl_max() {
        let err = Builder::new().ttl_max(0).build().unwrap_err();
        assert!(matches!(err, TraceError::BadConfig(_)));
    }

    #[test]
    fn test_build_largest_ttl_max() -> anyhow::Result<()> {
        let config = Builder::new().ttl_max(MAX_TTL).build()?;
        assert_eq!(TimeToLive(MAX_TTL), config.ttl_max);
        Ok(())
    }

    #[test]
    fn test_build_ttl_max_too_large() {
        let err = Builder::new().ttl_max(u8::MAX).build().unwrap_err();
        assert!(matches!(err, TraceError::BadConfig(_)));
    }

    #[test]
    fn test_build_zero_ttl_repeat_max() {
        let err = Builder::new().ttl_repeat_max(0).build().unwrap_err();
        assert!(matches!(err, TraceError::BadConfig(_)));
    }

    #[test]
    fn test_build_zero_mangle_freq() {
        let err = Builder::new().mangle_freq(0).build().unwrap_err();
        assert!(matches!(err, TraceError::BadConfig(_)));
    }

    #[test]
    fn test_build_zero_response_timeout() {
        let err = Builder::new()
            .response_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, TraceError::BadConfig(_)));
    }
}
