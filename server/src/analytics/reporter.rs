//! Periodic analytics summary in the logs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::messages::MessageStore;

use super::aggregate::aggregate;

/// Start a task that logs the analytics summary every `period`.
///
/// The first tick is consumed immediately so no scan runs during startup.
pub fn spawn_summary_reporter(
    store: Arc<dyn MessageStore>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // consume immediate first tick
        loop {
            interval.tick().await;
            report_summary(store.as_ref()).await;
        }
    })
}

/// Aggregate one snapshot and log it. A failed scan is logged and skipped.
#[tracing::instrument(skip(store))]
pub async fn report_summary(store: &dyn MessageStore) {
    let start = Instant::now();

    let messages = match store.snapshot().await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(error = %e, "Analytics summary scan failed");
            return;
        }
    };
    let analytics = aggregate(&messages);

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        sent = analytics.total.sent,
        read = analytics.total.read,
        replied = analytics.total.received_response,
        satisfied = analytics.sentiment.satisfied,
        neutral = analytics.sentiment.neutral,
        unsatisfied = analytics.sentiment.unsatisfied,
        "Analytics summary"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mp_common::{Message, NewMessage, ResponseSubmission};
    use uuid::Uuid;

    use super::*;
    use crate::messages::{InMemoryMessageStore, StoreError};

    /// Fails the first snapshot, then delegates to the in-memory store.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryMessageStore,
        snapshots: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for FlakyStore {
        fn backend(&self) -> &'static str {
            "flaky"
        }

        async fn create(&self, message: NewMessage) -> Result<Uuid, StoreError> {
            self.inner.create(message).await
        }

        async fn attach_response(
            &self,
            message_id: &str,
            response: ResponseSubmission,
        ) -> Result<(), StoreError> {
            self.inner.attach_response(message_id, response).await
        }

        async fn mark_read(
            &self,
            recipient_id: &str,
            read_at: DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            self.inner.mark_read(recipient_id, read_at).await
        }

        async fn snapshot(&self) -> Result<Vec<Message>, StoreError> {
            if self.snapshots.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.snapshot().await
        }
    }

    #[tokio::test]
    async fn report_summary_survives_failed_scan() {
        let store = FlakyStore::default();

        report_summary(&store).await;
        report_summary(&store).await;

        assert_eq!(store.snapshots.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_keeps_running_after_failed_scan() {
        let period = Duration::from_secs(60);
        let store = Arc::new(FlakyStore::default());
        let handle = spawn_summary_reporter(store.clone(), period);

        // Nothing is scanned at startup.
        tokio::task::yield_now().await;
        assert_eq!(store.snapshots.load(Ordering::SeqCst), 0);

        for _ in 0..10 {
            if store.snapshots.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(period).await;
            tokio::task::yield_now().await;
        }

        assert!(store.snapshots.load(Ordering::SeqCst) >= 2);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
