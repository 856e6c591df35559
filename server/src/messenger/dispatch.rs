//! Sub-event Dispatch
//!
//! Non-blocking entry point that hands classified webhook sub-events to a
//! background worker.
//!
//! Architecture:
//! - `Dispatcher::dispatch` classifies events and `try_send`s them into a
//!   bounded queue. It never awaits, so the webhook can acknowledge at once.
//! - When the queue is full the sub-event is dropped and reported; the
//!   channel has already been acknowledged so there is no one to push back on.
//! - The worker drains the queue and runs each sub-event in its own task,
//!   at most `max_concurrency` at a time. No ordering holds across tasks.
//! - Handler failures are logged as structured events and counted; they are
//!   never surfaced to the webhook caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::events::{MessageEvent, SubEvent};
use super::processing;
use crate::config::Config;
use crate::messages::MessageStore;

/// Queue and worker sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Sub-events that may wait for a worker slot.
    pub queue_capacity: usize,
    /// Sub-event handlers that may run at once.
    pub max_concurrency: usize,
}

impl DispatchConfig {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            queue_capacity: config.dispatch_queue_capacity,
            max_concurrency: config.dispatch_max_concurrency,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrency: 32,
        }
    }
}

/// Lifetime counters for dispatched sub-events.
#[derive(Debug, Default)]
pub struct DispatchStats {
    accepted: AtomicU64,
    ignored: AtomicU64,
    dropped: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub accepted: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl DispatchStats {
    #[must_use]
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl DispatchStatsSnapshot {
    /// Sub-events whose handler has finished, successfully or not.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Result of handing one webhook's events to the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub accepted: usize,
    pub ignored: usize,
    pub dropped: usize,
}

/// Cloneable handle to the sub-event queue.
///
/// The worker stops once every handle is dropped and in-flight handlers
/// have finished.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<SubEvent>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Start the dispatch worker.
    ///
    /// The returned `JoinHandle` completes after shutdown has drained the
    /// queue.
    pub fn spawn(store: Arc<dyn MessageStore>, config: DispatchConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(DispatchStats::default());

        let worker = tokio::spawn(run_worker(
            rx,
            store,
            Arc::clone(&stats),
            config.max_concurrency.max(1),
        ));

        (Self { tx, stats }, worker)
    }

    /// Classify and enqueue events without waiting for their handlers.
    pub fn dispatch(&self, events: Vec<MessageEvent>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for event in events {
            let Some(sub_event) = SubEvent::classify(event) else {
                report.ignored += 1;
                self.stats.ignored.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            match self.tx.try_send(sub_event) {
                Ok(()) => {
                    report.accepted += 1;
                    self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(sub_event)) => {
                    report.dropped += 1;
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event = "messenger.dispatch_dropped",
                        kind = sub_event.kind(),
                        sender_id = %sub_event.sender_id(),
                        reason = "queue_full",
                        "Dropping sub-event, dispatch queue is full"
                    );
                }
                Err(TrySendError::Closed(sub_event)) => {
                    report.dropped += 1;
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    error!(
                        event = "messenger.dispatch_dropped",
                        kind = sub_event.kind(),
                        sender_id = %sub_event.sender_id(),
                        reason = "worker_stopped",
                        "Dropping sub-event, dispatch worker is not running"
                    );
                }
            }
        }

        report
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<SubEvent>,
    store: Arc<dyn MessageStore>,
    stats: Arc<DispatchStats>,
    max_concurrency: usize,
) {
    info!(max_concurrency, "Sub-event dispatch worker started");

    let permits = Arc::new(Semaphore::new(max_concurrency));
    let mut in_flight = JoinSet::new();

    while let Some(sub_event) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };

        let store = Arc::clone(&store);
        let stats = Arc::clone(&stats);

        // Spawn with a panic-catching wrapper so one bad event can't take
        // the permit or the worker down with it. Release builds set
        // `panic = "abort"`, so this only contains panics in dev and test.
        in_flight.spawn(async move {
            let _permit = permit;
            let kind = sub_event.kind();
            let sender_id = sub_event.sender_id().to_owned();
            let stats_for_handler = Arc::clone(&stats);

            let handle = tokio::spawn(async move {
                handle_sub_event(store.as_ref(), &stats_for_handler, sub_event).await;
            });
            if let Err(e) = handle.await {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    event = "messenger.sub_event_panicked",
                    kind,
                    sender_id = %sender_id,
                    "Sub-event handler panicked: {}", e
                );
            }
        });

        // Reap finished tasks so the set only tracks in-flight work
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("Sub-event dispatch worker stopped");
}

async fn handle_sub_event(store: &dyn MessageStore, stats: &DispatchStats, sub_event: SubEvent) {
    let kind = sub_event.kind();
    let sender_id = sub_event.sender_id().to_owned();

    match processing::process(store, sub_event).await {
        Ok(outcome) => {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
            debug!(
                event = "messenger.sub_event_processed",
                kind,
                sender_id = %sender_id,
                ?outcome,
                "Sub-event processed"
            );
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                event = "messenger.sub_event_failed",
                kind,
                sender_id = %sender_id,
                error = %e,
                "Sub-event processing failed"
            );
        }
    }
}
