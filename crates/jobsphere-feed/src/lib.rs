//! Live listing feed.
//!
//! A [`FeedViewModel`] keeps a materialized, newest-first copy of the
//! listings collection, fed by a [`CollectionSubscription`]. It flags a newly
//! inserted listing for a short time and exposes a filtered view of the
//! collection as a copied-out [`FeedView`].

pub mod config;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod state;
pub mod subscription;
pub mod view_model;

pub use config::FeedConfig;
pub use error::FeedError;
pub use filter::{filter_listings, matches};
pub use highlight::HighlightScheduler;
pub use state::{FeedState, FeedStatus, FeedView};
pub use subscription::{CollectionSubscription, SnapshotEvent, SnapshotSink, SubscriptionHandle};
pub use view_model::FeedViewModel;
