//! Shared poller that turns the `jobs` collection into a push subscription.
//!
//! The Firestore REST API has no listen stream, so one background task reads
//! the whole collection on a fixed interval and publishes a snapshot whenever
//! the ordered content changes. Every feed view-model subscribes to this one
//! poller instead of querying Firestore itself.
//!
//! A streak of failed polls is reported to subscribers as a terminal failure.
//! The poller keeps running through it, so subscribers that arrive after
//! Firestore recovers start from a fresh snapshot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use jobsphere_feed::{CollectionSubscription, FeedConfig, SnapshotSink, SubscriptionHandle};
use jobsphere_firestore::{FirestoreResult, ListingRepository};
use jobsphere_models::Listing;

use crate::metrics;

/// Anything that can return every listing, newest first.
#[async_trait]
pub trait ListingSource: Send + Sync + 'static {
    /// `page_size` bounds each underlying read, not the result.
    async fn fetch_all(&self, page_size: u32) -> FirestoreResult<Vec<Listing>>;
}

#[async_trait]
impl ListingSource for ListingRepository {
    async fn fetch_all(&self, page_size: u32) -> FirestoreResult<Vec<Listing>> {
        self.list_all(page_size).await
    }
}

/// Latest state published by the poller.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedSnapshot {
    /// No poll has succeeded yet.
    #[default]
    Pending,
    Ready(Arc<Vec<Listing>>),
    /// The failure threshold was reached; cleared by the next successful poll.
    Failed(String),
}

impl FeedSnapshot {
    pub fn label(&self) -> &'static str {
        match self {
            FeedSnapshot::Pending => "pending",
            FeedSnapshot::Ready(_) => "ready",
            FeedSnapshot::Failed(_) => "failed",
        }
    }
}

pub struct ListingFeed {
    snapshots: Arc<watch::Sender<FeedSnapshot>>,
    subscribers: Arc<AtomicUsize>,
    poller: JoinHandle<()>,
}

impl ListingFeed {
    /// Start polling `source`. Must be called within a tokio runtime.
    pub fn spawn(source: Arc<dyn ListingSource>, config: &FeedConfig) -> Arc<Self> {
        let (tx, _) = watch::channel(FeedSnapshot::Pending);
        let snapshots = Arc::new(tx);

        let poller = Poller {
            source,
            snapshots: Arc::clone(&snapshots),
            poll_interval: config.poll_interval,
            page_size: config.page_size,
            max_failures: config.max_consecutive_failures.max(1),
        };

        info!(
            interval_ms = config.poll_interval.as_millis() as u64,
            page_size = config.page_size,
            "Starting listing feed poller"
        );

        Arc::new(Self {
            snapshots,
            subscribers: Arc::new(AtomicUsize::new(0)),
            poller: tokio::spawn(poller.run()),
        })
    }

    pub fn current(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Drop for ListingFeed {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

impl CollectionSubscription for ListingFeed {
    fn subscribe(&self, sink: SnapshotSink) -> SubscriptionHandle {
        let rx = self.snapshots.subscribe();
        let subscribers = Arc::clone(&self.subscribers);
        let task = tokio::spawn(async move {
            metrics::set_feed_subscribers(subscribers.fetch_add(1, Ordering::SeqCst) + 1);
            let _count = scopeguard::guard(subscribers, |subscribers| {
                metrics::set_feed_subscribers(subscribers.fetch_sub(1, Ordering::SeqCst) - 1);
            });
            forward(rx, sink).await;
        });
        SubscriptionHandle::from_task(task)
    }
}

/// Relay published snapshots to one subscriber until it leaves or fails.
async fn forward(mut rx: watch::Receiver<FeedSnapshot>, sink: SnapshotSink) {
    loop {
        let snapshot = rx.borrow_and_update().clone();
        match snapshot {
            FeedSnapshot::Pending => {}
            FeedSnapshot::Ready(items) => {
                if !sink.snapshot(items.as_ref().clone()) {
                    return;
                }
            }
            FeedSnapshot::Failed(reason) => {
                sink.fail(reason);
                return;
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    sink.fail("listing feed stopped");
                    return;
                }
            }
            _ = sink.closed() => return,
        }
    }
}

struct Poller {
    source: Arc<dyn ListingSource>,
    snapshots: Arc<watch::Sender<FeedSnapshot>>,
    poll_interval: Duration,
    page_size: u32,
    max_failures: u32,
}

impl Poller {
    async fn run(self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                Ok(published) => {
                    if failures > 0 {
                        info!(failures, "Listing feed recovered");
                    }
                    failures = 0;
                    if published {
                        debug!("Published listing snapshot");
                    }
                }
                Err(e) => {
                    failures += 1;
                    metrics::record_feed_poll_failure();
                    warn!(failures, "Listing feed poll failed: {:#}", e);

                    if failures == self.max_failures {
                        error!(failures, "Listing feed unavailable, failing subscribers");
                        self.snapshots.send_replace(FeedSnapshot::Failed(format!("{:#}", e)));
                    }
                }
            }
        }
    }

    /// Fetch once; returns whether a new snapshot was published.
    async fn poll_once(&self) -> anyhow::Result<bool> {
        let items = self
            .source
            .fetch_all(self.page_size)
            .await
            .context("fetching listings")?;
        let count = items.len();

        let published = self.snapshots.send_if_modified(|current| match current {
            FeedSnapshot::Ready(existing) if existing.as_slice() == items.as_slice() => false,
            _ => {
                *current = FeedSnapshot::Ready(Arc::new(items));
                true
            }
        });

        if published {
            metrics::record_feed_snapshot_published(count);
        }
        Ok(published)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use jobsphere_firestore::FirestoreError;

    use super::*;

    /// Source returning whatever the test last set.
    #[derive(Default)]
    pub struct FakeSource {
        pub next: Mutex<Option<Vec<Listing>>>,
        pub calls: AtomicU32,
    }

    impl FakeSource {
        pub fn with(items: Vec<Listing>) -> Arc<Self> {
            let source = Self::default();
            source.set(Some(items));
            Arc::new(source)
        }

        /// `None` makes every fetch fail.
        pub fn set(&self, items: Option<Vec<Listing>>) {
            *self.next.lock().unwrap() = items;
        }
    }

    #[async_trait]
    impl ListingSource for FakeSource {
        async fn fetch_all(&self, _page_size: u32) -> FirestoreResult<Vec<Listing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.next.lock().unwrap().clone() {
                Some(items) => Ok(items),
                None => Err(FirestoreError::ServerError(503, "unavailable".to_string())),
            }
        }
    }

    pub fn listing(id: &str, title: &str) -> Listing {
        let mut listing = Listing::new(id);
        listing.title = Some(title.to_string());
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use jobsphere_feed::{FeedStatus, FeedViewModel, SnapshotEvent};

    fn config(max_failures: u32) -> FeedConfig {
        FeedConfig {
            poll_interval: Duration::from_millis(100),
            max_consecutive_failures: max_failures,
            ..FeedConfig::default()
        }
    }

    fn ready_ids(snapshot: &FeedSnapshot) -> Vec<String> {
        match snapshot {
            FeedSnapshot::Ready(items) => items.iter().map(|l| l.id.to_string()).collect(),
            other => panic!("expected ready snapshot, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_only_when_content_changes() {
        let source = FakeSource::with(vec![listing("a", "Dev")]);
        let feed = ListingFeed::spawn(source.clone(), &config(5));
        let mut rx = feed.watch();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(ready_ids(&rx.borrow_and_update()), vec!["a"]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(source.calls.load(Ordering::SeqCst) >= 3);
        assert!(!rx.has_changed().unwrap());

        source.set(Some(vec![listing("b", "Ops"), listing("a", "Dev")]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(ready_ids(&rx.borrow_and_update()), vec!["b", "a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_threshold_and_recovers() {
        let source = Arc::new(FakeSource::default());
        let feed = ListingFeed::spawn(source.clone(), &config(3));

        // Polls at 0 and 100ms have failed.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(feed.current(), FeedSnapshot::Pending);

        // Third failure at 200ms.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(matches!(feed.current(), FeedSnapshot::Failed(_)));

        source.set(Some(vec![listing("a", "Dev")]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ready_ids(&feed.current()), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_forwards_snapshots_then_failure() {
        let source = FakeSource::with(vec![listing("a", "Dev")]);
        let feed = ListingFeed::spawn(source.clone(), &config(1));

        let (sink, mut events) = SnapshotSink::channel();
        let handle = feed.subscribe(sink);

        match events.recv().await {
            Some(SnapshotEvent::Snapshot(items)) => assert_eq!(items.len(), 1),
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert_eq!(feed.subscriber_count(), 1);

        source.set(None);
        assert!(matches!(events.recv().await, Some(SnapshotEvent::Failed(_))));
        // Nothing follows a failure.
        assert!(events.recv().await.is_none());
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_subscription_stops_forwarding() {
        let source = FakeSource::with(vec![listing("a", "Dev")]);
        let feed = ListingFeed::spawn(source.clone(), &config(5));

        let (sink, mut events) = SnapshotSink::channel();
        let handle = feed.subscribe(sink);
        assert!(events.recv().await.is_some());

        handle.unsubscribe();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.subscriber_count(), 0);

        source.set(Some(vec![listing("b", "Ops")]));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_model_reads_from_feed() {
        let source = FakeSource::with(vec![listing("a", "Rust developer"), listing("b", "Chef")]);
        let feed = ListingFeed::spawn(source.clone(), &config(5));

        let vm = FeedViewModel::activate_with_filter(feed.as_ref(), &FeedConfig::default(), "rust".to_string());
        let mut views = vm.watch();
        views
            .wait_for(|view| view.status == FeedStatus::Ready)
            .await
            .unwrap();

        let view = vm.view();
        assert_eq!(view.total, 2);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].id.as_str(), "a");

        vm.shutdown().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_beyond_one_page_is_highlighted() {
        let source = FakeSource::with(vec![listing("b", "Ops"), listing("a", "Dev")]);
        let feed_config = FeedConfig {
            page_size: 2,
            ..config(5)
        };
        let feed = ListingFeed::spawn(source.clone(), &feed_config);

        let vm = FeedViewModel::activate(feed.as_ref(), &feed_config);
        let mut views = vm.watch();
        views.wait_for(|view| view.total == 2).await.unwrap();

        source.set(Some(vec![
            listing("c", "QA"),
            listing("b", "Ops"),
            listing("a", "Dev"),
        ]));
        let view = views
            .wait_for(|view| view.total == 3)
            .await
            .unwrap()
            .clone();

        let ids: Vec<&str> = view.items.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(view.highlighted_id.as_ref().map(|id| id.as_str()), Some("c"));

        vm.shutdown().await;
    }
}
