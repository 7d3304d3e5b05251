//! Configuration for the engine.

use crate::error::{EngineError, EngineResult};
use revsync_protocol::Environment;
use std::time::Duration;

/// The SDK version string reported on every request.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for an engine session.
///
/// The configuration is an immutable snapshot: it is validated once at
/// initialization and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SDK version string.
    pub sdk_version: String,
    /// Access key identifying the application to the remote service.
    pub access_key: String,
    /// Base URL of the remote service.
    pub base_url: String,
    /// Whether purchases are tracked automatically from billing events.
    pub auto_tracking: bool,
    /// Period between property uploads.
    pub upload_period: Duration,
    /// Bounded wait for the advertising-id provider.
    pub ad_id_timeout: Duration,
    /// Retry configuration for the token fetch.
    pub retry: RetryConfig,
    /// Environment snapshot attached to outbound requests.
    pub environment: Environment,
}

impl EngineConfig {
    /// Creates a new configuration.
    pub fn new(access_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            sdk_version: SDK_VERSION.to_string(),
            access_key: access_key.into(),
            base_url: base_url.into(),
            auto_tracking: false,
            upload_period: Duration::from_secs(5),
            ad_id_timeout: Duration::from_secs(3),
            retry: RetryConfig::default(),
            environment: Environment::default(),
        }
    }

    /// Enables automatic purchase tracking from billing events.
    pub fn with_auto_tracking(mut self, enabled: bool) -> Self {
        self.auto_tracking = enabled;
        self
    }

    /// Sets the property upload period.
    pub fn with_upload_period(mut self, period: Duration) -> Self {
        self.upload_period = period;
        self
    }

    /// Sets the bounded wait for advertising-id resolution.
    pub fn with_ad_id_timeout(mut self, timeout: Duration) -> Self {
        self.ad_id_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the environment snapshot.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the access key is empty.
    pub fn validate(&self) -> EngineResult<()> {
        if self.access_key.is_empty() {
            return Err(EngineError::Configuration(
                "access key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration without jitter, for deterministic tests.
    pub fn no_jitter() -> Self {
        Self {
            add_jitter: false,
            ..Self::new()
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before a given retry attempt (1-indexed;
    /// attempt 0 is the initial try and has no delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple deterministic "jitter" (no external RNG dependency).
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
