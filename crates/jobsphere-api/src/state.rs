//! Application state.

use std::sync::Arc;

use jobsphere_feed::FeedConfig;
use jobsphere_firestore::{ContactRepository, FirestoreClient, ListingRepository};

use crate::auth::JwksCache;
use crate::config::ApiConfig;
use crate::services::ListingFeed;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub feed_config: FeedConfig,
    pub firestore: Arc<FirestoreClient>,
    pub listings: ListingRepository,
    pub contacts: ContactRepository,
    pub jwks: Arc<JwksCache>,
    pub feed: Arc<ListingFeed>,
}

impl AppState {
    /// Connect to Firestore, load the token signing keys and start the feed poller.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let firestore = FirestoreClient::from_env().await?;
        let jwks = JwksCache::new(firestore.config().project_id.clone()).await?;
        let feed_config = FeedConfig::from_env();

        let listings = ListingRepository::new(firestore.clone());
        let feed = ListingFeed::spawn(Arc::new(listings), &feed_config);

        Ok(Self::with_feed(config, feed_config, firestore, jwks, feed))
    }

    /// Assemble state around an already running feed.
    pub fn with_feed(
        config: ApiConfig,
        feed_config: FeedConfig,
        firestore: FirestoreClient,
        jwks: JwksCache,
        feed: Arc<ListingFeed>,
    ) -> Self {
        Self {
            config,
            feed_config,
            listings: ListingRepository::new(firestore.clone()),
            contacts: ContactRepository::new(firestore.clone()),
            firestore: Arc::new(firestore),
            jwks: Arc::new(jwks),
            feed,
        }
    }
}
