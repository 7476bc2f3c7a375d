//! Periodic full refresh of the shared message log.
//!
//! A background task refetches the whole list on a fixed cadence and publishes
//! it as a [`Snapshot`]. Each fetch replaces the previous snapshot wholesale.
//! A failed tick is logged and the next tick runs as scheduled.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::MessageStore;
use crate::types::Message;

/// Latest known state of the conversation log.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub messages: Arc<Vec<Message>>,
    /// True until the first fetch attempt completes
    pub loading: bool,
    /// User-facing error from the most recent fetch, cleared by the next success
    pub last_error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Invalidation epoch of the most recent completed fetch
    pub epoch: u64,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            messages: Arc::new(Vec::new()),
            loading: true,
            last_error: None,
            fetched_at: None,
            epoch: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Handle that forces the synchronizer to refetch immediately.
///
/// Every invalidation bumps an epoch. A fetch that was already in flight when
/// the epoch moved is thrown away and redone, so a snapshot carrying epoch `n`
/// was requested after invalidation `n`.
#[derive(Debug, Clone, Default)]
pub struct Invalidator {
    epoch: Arc<AtomicU64>,
    notify: Arc<Notify>,
}

impl Invalidator {
    /// Mark the snapshot stale and return the epoch a fresh fetch will carry.
    pub fn invalidate(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.notify.notify_one();
        epoch
    }

    pub fn current(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Polling synchronizer. Dropping it stops the timer.
pub struct Synchronizer {
    snapshot: watch::Receiver<Snapshot>,
    invalidator: Invalidator,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Synchronizer {
    /// Start polling `store` every `interval`. The first fetch runs immediately.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn(store: Arc<dyn MessageStore>, interval: Duration) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::initial());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let invalidator = Invalidator::default();

        tracing::debug!("Starting message poll loop every {:?}", interval);
        let task = tokio::spawn(poll_loop(
            store,
            interval,
            snapshot_tx,
            invalidator.clone(),
            shutdown_rx,
        ));

        Self {
            snapshot: snapshot_rx,
            invalidator,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    pub fn invalidator(&self) -> Invalidator {
        self.invalidator.clone()
    }

    /// Force an immediate refetch without waiting for the next tick.
    pub fn refresh(&self) -> u64 {
        self.invalidator.invalidate()
    }

    /// Wait until a fetch started after invalidation `epoch` has completed.
    ///
    /// Returns the last published snapshot if the poll loop has stopped.
    pub async fn wait_for_epoch(&self, epoch: u64) -> Snapshot {
        let mut rx = self.snapshot.clone();
        let result = rx.wait_for(|s| s.epoch >= epoch).await.map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Stop polling and wait for the loop to exit.
    ///
    /// A fetch already in flight is allowed to finish; its result is dropped.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Poll loop ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

fn is_stopped(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

async fn poll_loop(
    store: Arc<dyn MessageStore>,
    interval: Duration,
    snapshot_tx: watch::Sender<Snapshot>,
    invalidator: Invalidator,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = invalidator.notify.notified() => {
                // Next scheduled poll counts from this refresh
                ticker.reset();
            }
            _ = shutdown.changed() => {}
        }

        if is_stopped(&shutdown) {
            break;
        }

        let epoch = invalidator.current();
        let result = store.list_messages().await;

        if is_stopped(&shutdown) {
            tracing::debug!("Poll loop stopped mid-fetch, discarding result");
            break;
        }
        if invalidator.current() != epoch {
            tracing::trace!("Snapshot invalidated during fetch, refetching");
            continue;
        }

        match result {
            Ok(messages) => {
                tracing::debug!("Fetched {} messages", messages.len());
                snapshot_tx.send_if_modified(|snapshot| {
                    let changed = snapshot.loading
                        || snapshot.epoch != epoch
                        || snapshot.last_error.is_some()
                        || *snapshot.messages != messages;
                    snapshot.messages = Arc::new(messages);
                    snapshot.loading = false;
                    snapshot.last_error = None;
                    snapshot.fetched_at = Some(Utc::now());
                    snapshot.epoch = epoch;
                    changed
                });
            }
            Err(e) => {
                tracing::warn!("Message poll failed, will retry next tick: {}", e);
                let message = e.user_message();
                snapshot_tx.send_if_modified(|snapshot| {
                    let changed = snapshot.loading
                        || snapshot.epoch != epoch
                        || snapshot.last_error.as_deref() != Some(message.as_str());
                    snapshot.loading = false;
                    snapshot.last_error = Some(message);
                    snapshot.epoch = epoch;
                    changed
                });
            }
        }
    }

    tracing::debug!("Message poll loop exited");
}
