//! OAuth access token cache for the Firestore REST API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Assumed lifetime when the provider reports an unusable expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Shared token cache. Concurrent callers that find a stale token serialize
/// on the write lock so only one of them hits the token endpoint.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(Instant::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(Instant::now()) {
                return Ok(cached.access_token.clone());
            }
        }

        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let remaining = token.expires_at() - Utc::now();
                let expires_at = Instant::now()
                    + if remaining <= chrono::Duration::zero() {
                        Duration::ZERO
                    } else {
                        remaining.to_std().unwrap_or(TOKEN_DEFAULT_TTL)
                    };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });
                debug!("Refreshed Firestore access token");
                Ok(access_token)
            }
            // Keep serving a token that has not expired yet.
            Err(e) => match cache.as_ref() {
                Some(cached) if cached.is_usable(Instant::now()) => {
                    warn!("Token refresh failed, reusing current token: {}", e);
                    Ok(cached.access_token.clone())
                }
                _ => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain access token: {}",
                    e
                ))),
            },
        }
    }
}
