//! Feed configuration.

use std::time::Duration;

/// Feed timing and sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// How long a newly inserted listing stays highlighted.
    pub highlight_delay: Duration,
    /// Interval between polls of the listings collection.
    pub poll_interval: Duration,
    /// Documents read per request while fetching the whole collection.
    pub page_size: u32,
    /// Consecutive poll failures before subscribers are told the feed failed.
    pub max_consecutive_failures: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            highlight_delay: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(2000),
            page_size: 200,
            max_consecutive_failures: 5,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let count = |key: &str, default: u32| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        Self {
            highlight_delay: millis("FEED_HIGHLIGHT_DELAY_MS", defaults.highlight_delay),
            poll_interval: millis("FEED_POLL_INTERVAL_MS", defaults.poll_interval),
            page_size: count("FEED_PAGE_SIZE", defaults.page_size),
            max_consecutive_failures: count(
                "FEED_MAX_CONSECUTIVE_FAILURES",
                defaults.max_consecutive_failures,
            ),
        }
    }
}
