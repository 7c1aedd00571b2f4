//! Client configuration.

use std::time::Duration;

/// Base URL used when `ISHY_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// API key used when `ISHY_API_KEY` is not set.
pub const DEFAULT_API_KEY: &str = "change-me";

/// Storage key holding the captured user ID.
pub const DEFAULT_IDENTITY_KEY: &str = "ishy_user_id";

/// Default cadence of the aggregate stats poll.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Smallest accepted poll interval (tokio panics on a zero period).
pub(crate) const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default time `dispose` waits for the polling task.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for an [`IshyController`](crate::controller::IshyController).
///
/// # Example
///
/// ```
/// use ishy_client::IshyConfig;
/// use std::time::Duration;
///
/// let config = IshyConfig::new("https://api.ishy.example", "secret")
///     .with_poll_interval(Duration::from_secs(5));
/// assert_eq!(config.api_key, "secret");
/// assert_eq!(config.poll_interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct IshyConfig {
    /// Base URL of the Ishy API, without a trailing path.
    pub base_url: String,
    /// Static bearer credential attached to every request.
    pub api_key: String,
    /// Interval between aggregate stats refreshes while an identity is present.
    ///
    /// Defaults to **3 seconds**. Values below 1 ms are clamped.
    pub poll_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// Events that do not fit are dropped with a warning; the latest state
    /// is always available through `snapshot()`.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long `dispose` waits for the polling task before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Key under which the user ID is persisted.
    pub identity_key: String,
}

impl IshyConfig {
    /// Create a configuration for the given API endpoint and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            identity_key: DEFAULT_IDENTITY_KEY.to_string(),
        }
    }

    /// Build a configuration from `ISHY_API_URL` and `ISHY_API_KEY`,
    /// falling back to the local development defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ISHY_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key =
            std::env::var("ISHY_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());
        Self::new(base_url, api_key)
    }

    /// Set the aggregate stats poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Set the capacity of the bounded event channel.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set how long `dispose` waits for the polling task.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the storage key used for the user ID.
    #[must_use]
    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }
}

impl Default for IshyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IshyConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_key, "change-me");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.identity_key, "ishy_user_id");
    }

    #[test]
    fn builder_methods() {
        let config = IshyConfig::new("http://x", "k")
            .with_poll_interval(Duration::from_millis(250))
            .with_event_channel_capacity(8)
            .with_shutdown_timeout(Duration::from_secs(4))
            .with_identity_key("other");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.event_channel_capacity, 8);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(4));
        assert_eq!(config.identity_key, "other");
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let config = IshyConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_event_channel_capacity(0);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.event_channel_capacity, 1);
    }
}
