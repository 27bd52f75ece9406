//! Push subscription contract between a listing source and a view-model.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use jobsphere_models::Listing;

use crate::error::FeedError;

/// One delivery from a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// The full collection, newest first.
    Snapshot(Vec<Listing>),
    /// Terminal failure; nothing follows it.
    Failed(FeedError),
}

/// Delivery end handed to a source on subscribe.
///
/// Events are delivered in send order over a single channel. Sends return
/// false once the subscriber has gone away.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

impl SnapshotSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SnapshotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn snapshot(&self, items: Vec<Listing>) -> bool {
        self.tx.send(SnapshotEvent::Snapshot(items)).is_ok()
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(SnapshotEvent::Failed(FeedError::SubscriptionFailed(reason.into())))
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the subscriber has dropped its receiver.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// A source that pushes full snapshots of the listings collection.
pub trait CollectionSubscription: Send + Sync {
    /// Start delivering to `sink` until the returned handle is released.
    fn subscribe(&self, sink: SnapshotSink) -> SubscriptionHandle;
}

/// Releases a subscription when dropped or when [`unsubscribe`](Self::unsubscribe)
/// is called, whichever comes first.
pub struct SubscriptionHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Handle for a subscription driven by a spawned task; releasing aborts it.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}
