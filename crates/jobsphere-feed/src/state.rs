//! Synchronous feed state: the materialized list, status and filter.

use std::collections::HashSet;

use serde::Serialize;

use jobsphere_models::{Listing, ListingId};

use crate::error::FeedError;
use crate::filter::filter_listings;

/// Display state of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No snapshot received yet.
    #[default]
    Loading,
    Ready,
    /// The subscription failed; no further snapshots are applied.
    Unavailable { reason: String },
}

/// Copied-out view of a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FeedView {
    pub status: FeedStatus,
    pub filter_query: String,
    /// Listings in the last snapshot, before filtering.
    pub total: usize,
    pub highlighted_id: Option<ListingId>,
    /// Listings matching `filter_query`, newest first.
    pub items: Vec<Listing>,
}

#[derive(Debug, Default)]
pub struct FeedState {
    items: Vec<Listing>,
    status: FeedStatus,
    filter_query: String,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter_query(query: impl Into<String>) -> Self {
        Self {
            filter_query: query.into(),
            ..Self::default()
        }
    }

    /// Replace the list with `items` and return the id to highlight, if any.
    ///
    /// Only net growth over a non-empty previous list highlights, and then
    /// only the first id (in snapshot order) that was not present before.
    pub fn on_snapshot(&mut self, items: Vec<Listing>) -> Option<ListingId> {
        if matches!(self.status, FeedStatus::Unavailable { .. }) {
            return None;
        }

        let inserted = if !self.items.is_empty() && items.len() > self.items.len() {
            let previous: HashSet<&ListingId> = self.items.iter().map(|l| &l.id).collect();
            items
                .iter()
                .find(|l| !previous.contains(&l.id))
                .map(|l| l.id.clone())
        } else {
            None
        };

        self.items = items;
        self.status = FeedStatus::Ready;
        inserted
    }

    /// Move to the terminal unavailable state.
    pub fn on_error(&mut self, cause: FeedError) {
        self.status = FeedStatus::Unavailable {
            reason: cause.to_string(),
        };
    }

    pub fn set_filter_query(&mut self, query: impl Into<String>) {
        self.filter_query = query.into();
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn items(&self) -> Vec<Listing> {
        self.items.clone()
    }

    pub fn visible_items(&self) -> Vec<Listing> {
        filter_listings(&self.items, &self.filter_query)
    }

    pub fn view(&self, highlighted_id: Option<ListingId>) -> FeedView {
        FeedView {
            status: self.status.clone(),
            filter_query: self.filter_query.clone(),
            total: self.items.len(),
            highlighted_id,
            items: self.visible_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> Listing {
        let mut l = Listing::new(id);
        l.title = Some(format!("Job {}", id));
        l
    }

    fn snapshot(ids: &[&str]) -> Vec<Listing> {
        ids.iter().map(|id| listing(id)).collect()
    }

    fn ids(items: &[Listing]) -> Vec<&str> {
        items.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_snapshot_replaces_items_in_order() {
        let mut state = FeedState::new();
        assert_eq!(state.status(), &FeedStatus::Loading);

        state.on_snapshot(snapshot(&["c", "b", "a"]));
        assert_eq!(ids(&state.items()), vec!["c", "b", "a"]);

        state.on_snapshot(snapshot(&["a", "c"]));
        assert_eq!(ids(&state.items()), vec!["a", "c"]);
        assert_eq!(state.status(), &FeedStatus::Ready);
    }

    #[test]
    fn test_first_snapshot_never_highlights() {
        let mut state = FeedState::new();
        assert_eq!(state.on_snapshot(snapshot(&["b", "a"])), None);
    }

    #[test]
    fn test_growth_after_empty_snapshot_does_not_highlight() {
        let mut state = FeedState::new();
        state.on_snapshot(Vec::new());
        assert_eq!(state.on_snapshot(snapshot(&["a"])), None);
    }

    #[test]
    fn test_net_growth_highlights_new_id() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["b", "a"]));
        assert_eq!(state.on_snapshot(snapshot(&["x", "b", "a"])), Some(ListingId::from("x")));
    }

    #[test]
    fn test_first_new_id_in_snapshot_order_wins() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["a"]));
        assert_eq!(state.on_snapshot(snapshot(&["b", "a", "c"])), Some(ListingId::from("b")));
    }

    #[test]
    fn test_shrink_or_same_size_never_highlights() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["b", "a"]));
        // Same size with a replaced member.
        assert_eq!(state.on_snapshot(snapshot(&["x", "a"])), None);
        // Reorder.
        assert_eq!(state.on_snapshot(snapshot(&["a", "x"])), None);
        // Shrink with a new member.
        assert_eq!(state.on_snapshot(snapshot(&["y"])), None);
    }

    #[test]
    fn test_payload_update_never_highlights() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["a"]));
        let mut edited = listing("a");
        edited.title = Some("Renamed".to_string());
        assert_eq!(state.on_snapshot(vec![edited]), None);
        assert_eq!(state.items()[0].title.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_error_is_terminal() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["a"]));
        state.on_error(FeedError::SubscriptionFailed("permission denied".to_string()));
        assert!(matches!(state.status(), FeedStatus::Unavailable { .. }));

        assert_eq!(state.on_snapshot(snapshot(&["b", "a"])), None);
        assert_eq!(ids(&state.items()), vec!["a"]);
        assert!(matches!(state.status(), FeedStatus::Unavailable { .. }));
    }

    #[test]
    fn test_filter_does_not_touch_items() {
        let mut state = FeedState::new();
        state.on_snapshot(snapshot(&["b", "a"]));
        state.set_filter_query("JOB A");
        assert_eq!(ids(&state.visible_items()), vec!["a"]);
        assert_eq!(state.items().len(), 2);

        state.set_filter_query("");
        assert_eq!(state.visible_items(), state.items());
    }

    #[test]
    fn test_view_is_a_copy() {
        let mut state = FeedState::with_filter_query("job b");
        state.on_snapshot(snapshot(&["b", "a"]));
        let view = state.view(Some(ListingId::from("b")));

        state.on_snapshot(Vec::new());
        assert_eq!(view.total, 2);
        assert_eq!(ids(&view.items), vec!["b"]);
        assert_eq!(view.highlighted_id, Some(ListingId::from("b")));
        assert_eq!(view.filter_query, "job b");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(FeedStatus::Unavailable {
            reason: "down".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"state": "unavailable", "reason": "down"}));
    }
}
