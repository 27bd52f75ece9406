//! Delayed reset of the highlighted listing.

use std::time::Duration;

use tokio::time::Instant;

use jobsphere_models::ListingId;

/// Holds the highlighted listing and at most one pending clear.
///
/// The scheduler never sleeps itself. The owner waits on [`wait_until`] with
/// the current [`deadline`](Self::deadline) and calls [`expire`](Self::expire)
/// when it elapses, so dropping the wait at any point leaves state untouched.
#[derive(Debug)]
pub struct HighlightScheduler {
    delay: Duration,
    highlighted: Option<ListingId>,
    pending: Option<(ListingId, Instant)>,
}

impl HighlightScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            highlighted: None,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn highlighted(&self) -> Option<&ListingId> {
        self.highlighted.as_ref()
    }

    /// When the pending clear is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Highlight `id` and replace any pending clear with one for `id`.
    pub fn schedule(&mut self, id: ListingId) {
        self.pending = Some((id.clone(), Instant::now() + self.delay));
        self.highlighted = Some(id);
    }

    /// Drop the pending clear. The current highlight is kept.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Run the pending clear if it is due at `now`.
    ///
    /// Returns true when the highlight was cleared. A clear only removes the
    /// highlight it was scheduled for.
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some((_, at)) if *at <= now => {}
            _ => return false,
        }
        let Some((id, _)) = self.pending.take() else {
            return false;
        };
        if self.highlighted.as_ref() == Some(&id) {
            self.highlighted = None;
            true
        } else {
            false
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1500);

    fn id(s: &str) -> ListingId {
        ListingId::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_clears_after_delay() {
        let mut scheduler = HighlightScheduler::new(DELAY);
        scheduler.schedule(id("x"));
        assert_eq!(scheduler.highlighted(), Some(&id("x")));

        tokio::time::advance(DELAY - Duration::from_millis(1)).await;
        assert!(!scheduler.expire(Instant::now()));
        assert_eq!(scheduler.highlighted(), Some(&id("x")));

        wait_until(scheduler.deadline()).await;
        assert!(scheduler.expire(Instant::now()));
        assert_eq!(scheduler.highlighted(), None);
        assert_eq!(scheduler.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_highlight_supersedes_older_clear() {
        let mut scheduler = HighlightScheduler::new(DELAY);
        scheduler.schedule(id("x"));
        let x_deadline = scheduler.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        scheduler.schedule(id("y"));

        tokio::time::sleep_until(x_deadline + Duration::from_millis(1)).await;
        assert!(!scheduler.expire(Instant::now()));
        assert_eq!(scheduler.highlighted(), Some(&id("y")));

        wait_until(scheduler.deadline()).await;
        assert!(scheduler.expire(Instant::now()));
        assert_eq!(scheduler.highlighted(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_highlight_but_never_clears() {
        let mut scheduler = HighlightScheduler::new(DELAY);
        scheduler.schedule(id("x"));
        scheduler.cancel();

        tokio::time::advance(DELAY * 2).await;
        assert!(!scheduler.expire(Instant::now()));
        assert_eq!(scheduler.highlighted(), Some(&id("x")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_deadline_stays_pending() {
        let waited = tokio::time::timeout(Duration::from_secs(60), wait_until(None)).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_at_most_one_pending_clear() {
        let mut scheduler = HighlightScheduler::new(DELAY);
        scheduler.schedule(id("a"));
        scheduler.schedule(id("b"));
        scheduler.schedule(id("c"));
        assert!(scheduler.deadline().is_some());
        assert_eq!(scheduler.highlighted(), Some(&id("c")));

        scheduler.cancel();
        assert!(scheduler.deadline().is_none());
    }
}
