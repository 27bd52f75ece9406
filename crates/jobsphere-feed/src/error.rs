//! Feed error types.

use thiserror::Error;

/// Terminal failures of a feed subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Listing subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Listing subscription closed")]
    SubscriptionClosed,
}
