//! Background services.

pub mod listing_feed;

pub use listing_feed::{FeedSnapshot, ListingFeed, ListingSource};
