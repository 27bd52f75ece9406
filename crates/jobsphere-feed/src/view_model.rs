//! The activated feed view-model.
//!
//! One task per view-model owns the [`FeedState`] and the
//! [`HighlightScheduler`]. Snapshots, filter commands and highlight expiry are
//! handled one at a time on that task, and every change is published as a
//! fresh [`FeedView`] on a watch channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::highlight::{self, HighlightScheduler};
use crate::state::{FeedState, FeedView};
use crate::subscription::{CollectionSubscription, SnapshotEvent, SnapshotSink, SubscriptionHandle};

const ACTIVE_VIEW_MODELS: &str = "jobsphere_feed_active_view_models";
const HIGHLIGHTS_TOTAL: &str = "jobsphere_feed_highlights_total";

#[derive(Debug)]
enum Command {
    SetFilter(String),
    Shutdown,
}

/// Handle to a running view-model.
///
/// Dropping the handle tears the view-model down; [`shutdown`](Self::shutdown)
/// does the same and waits for it to finish.
pub struct FeedViewModel {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<FeedView>,
    task: Option<JoinHandle<()>>,
}

impl FeedViewModel {
    /// Subscribe to `source` and start processing. Must be called within a
    /// tokio runtime.
    pub fn activate<S>(source: &S, config: &FeedConfig) -> Self
    where
        S: CollectionSubscription + ?Sized,
    {
        Self::activate_with_filter(source, config, String::new())
    }

    pub fn activate_with_filter<S>(source: &S, config: &FeedConfig, filter_query: String) -> Self
    where
        S: CollectionSubscription + ?Sized,
    {
        let state = FeedState::with_filter_query(filter_query);
        let (view_tx, view_rx) = watch::channel(state.view(None));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let (sink, events) = SnapshotSink::channel();
        let subscription = source.subscribe(sink);

        let task = tokio::spawn(run(
            state,
            HighlightScheduler::new(config.highlight_delay),
            subscription,
            events,
            command_rx,
            view_tx,
        ));

        Self {
            commands: command_tx,
            view: view_rx,
            task: Some(task),
        }
    }

    /// Current view.
    pub fn view(&self) -> FeedView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every view change.
    pub fn watch(&self) -> watch::Receiver<FeedView> {
        self.view.clone()
    }

    pub fn set_filter_query(&self, query: impl Into<String>) {
        // Fails only after teardown, when there is nothing left to filter.
        let _ = self.commands.send(Command::SetFilter(query.into()));
    }

    /// Tear down and wait until the subscription is released.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Feed view-model task panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for FeedViewModel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut state: FeedState,
    mut scheduler: HighlightScheduler,
    subscription: SubscriptionHandle,
    mut events: mpsc::UnboundedReceiver<SnapshotEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    view_tx: watch::Sender<FeedView>,
) {
    metrics::gauge!(ACTIVE_VIEW_MODELS).increment(1.0);
    let _active = scopeguard::guard((), |_| {
        metrics::gauge!(ACTIVE_VIEW_MODELS).decrement(1.0);
    });

    // Dropped on every exit from this function, including abort.
    let mut subscription = Some(subscription);

    loop {
        let deadline = scheduler.deadline();

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::SetFilter(query)) => state.set_filter_query(query),
                Some(Command::Shutdown) | None => break,
            },
            event = events.recv(), if subscription.is_some() => match event {
                Some(SnapshotEvent::Snapshot(items)) => {
                    debug!(count = items.len(), "Applying feed snapshot");
                    if let Some(id) = state.on_snapshot(items) {
                        metrics::counter!(HIGHLIGHTS_TOTAL).increment(1);
                        scheduler.schedule(id);
                    }
                }
                Some(SnapshotEvent::Failed(cause)) => {
                    warn!("Feed subscription failed: {}", cause);
                    state.on_error(cause);
                    drop(subscription.take());
                }
                None => {
                    info!("Feed subscription closed by source");
                    state.on_error(FeedError::SubscriptionClosed);
                    drop(subscription.take());
                }
            },
            _ = highlight::wait_until(deadline) => {
                if !scheduler.expire(Instant::now()) {
                    continue;
                }
            }
        }

        let next = state.view(scheduler.highlighted().cloned());
        view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    scheduler.cancel();
    drop(subscription);
}
