//! Deferred self-deletion of sent messages.
//!
//! Each deletion is its own tokio task sleeping on the runtime clock, so
//! tests drive it with a paused clock instead of real waits. Pending
//! deletions live only in memory and are lost on restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::telegram::Messenger;

/// Handle to one scheduled deletion.
#[derive(Debug)]
pub struct PendingDeletion {
    pub chat_id: i64,
    pub message_id: i64,
    pub fire_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl PendingDeletion {
    /// Abort the deletion if it has not fired yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

pub struct CleanupScheduler<M> {
    messenger: Arc<M>,
}

impl<M> Clone for CleanupScheduler<M> {
    fn clone(&self) -> Self {
        Self {
            messenger: self.messenger.clone(),
        }
    }
}

impl<M: Messenger> CleanupScheduler<M> {
    pub fn new(messenger: Arc<M>) -> Self {
        Self { messenger }
    }

    /// Delete `(chat_id, message_id)` once `delay` has elapsed.
    ///
    /// Fires exactly once. A failed delete is logged and dropped.
    pub fn schedule_delete(&self, chat_id: i64, message_id: i64, delay: Duration) -> PendingDeletion {
        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!("Scheduled delete of msg {} in chat {} at {}", message_id, chat_id, fire_at);

        let messenger = self.messenger.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match messenger.delete_message(chat_id, message_id).await {
                Ok(()) => info!("Auto-deleted msg {} in chat {}", message_id, chat_id),
                Err(e) => warn!("Failed to delete message {} in chat {}: {e}", message_id, chat_id),
            }
        });

        PendingDeletion {
            chat_id,
            message_id,
            fire_at,
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::tests::FakeMessenger;

    const DELAY: Duration = Duration::from_secs(43200);

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = CleanupScheduler::new(messenger.clone());

        let pending = scheduler.schedule_delete(42, 7, DELAY);
        assert_eq!((pending.chat_id, pending.message_id), (42, 7));

        tokio::time::sleep(DELAY - Duration::from_secs(1)).await;
        assert!(messenger.deleted().is_empty());
        assert!(!pending.is_finished());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(messenger.deleted(), vec![(42, 7)]);

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(messenger.deleted(), vec![(42, 7)]);
        assert!(pending.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_time_is_delay_from_now() {
        let scheduler = CleanupScheduler::new(Arc::new(FakeMessenger::default()));
        let before = Utc::now();
        let pending = scheduler.schedule_delete(1, 2, Duration::from_secs(30));
        let offset = (pending.fire_at - before).num_seconds();
        assert!((29..=31).contains(&offset));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_delay_does_not_panic() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = CleanupScheduler::new(messenger.clone());

        let pending = scheduler.schedule_delete(1, 2, Duration::from_secs(1_000_000_000_000_000));
        assert_eq!(pending.fire_at, DateTime::<Utc>::MAX_UTC);

        tokio::time::sleep(Duration::from_secs(86400)).await;
        assert_eq!(messenger.delete_attempts(), 0);
        pending.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_does_not_affect_others() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.fail_delete(2);
        let scheduler = CleanupScheduler::new(messenger.clone());

        scheduler.schedule_delete(10, 1, Duration::from_secs(30));
        let failing = scheduler.schedule_delete(10, 2, Duration::from_secs(30));
        scheduler.schedule_delete(10, 3, Duration::from_secs(720));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(failing.is_finished());
        assert_eq!(messenger.deleted(), vec![(10, 1)]);

        tokio::time::sleep(Duration::from_secs(720)).await;
        assert_eq!(messenger.deleted(), vec![(10, 1), (10, 3)]);
        assert_eq!(messenger.delete_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_delete() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = CleanupScheduler::new(messenger.clone());

        let pending = scheduler.schedule_delete(5, 9, Duration::from_secs(60));
        pending.cancel();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(messenger.delete_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_independent_timers() {
        let messenger = Arc::new(FakeMessenger::default());
        let scheduler = CleanupScheduler::new(messenger.clone());

        for id in (1..=20).rev() {
            scheduler.schedule_delete(1, id, Duration::from_secs(id as u64));
        }

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let mut deleted: Vec<i64> = messenger.deleted().into_iter().map(|(_, id)| id).collect();
        deleted.sort();
        assert_eq!(deleted, (1..=10).collect::<Vec<_>>());
    }
}
