//! Background cart push, one worker per bound user.
//!
//! Mutations publish the whole item list into a `watch` channel, so a
//! pending push always carries the newest state and older states are
//! overwritten. The worker waits for a quiet period, restarting it on every
//! new state, then pushes once. Dropping the [`SyncWorker`] cancels the
//! task, including a push that is already on the wire.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use essence_core::{CartLines, UserId};

use crate::api::CartApi;

/// Load/push bookkeeping shared between a session and its worker.
#[derive(Debug, Default)]
pub(crate) struct SyncStatus {
    in_flight: AtomicUsize,
    last_sync: Mutex<LastSync>,
}

#[derive(Debug, Default)]
struct LastSync {
    /// Bumped on every user rebind; results from older generations are ignored.
    generation: u64,
    at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub(crate) fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub(crate) fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync.lock().at
    }

    pub(crate) fn generation(&self) -> u64 {
        self.last_sync.lock().generation
    }

    /// Start a new generation and forget the last sync time.
    pub(crate) fn rebind(&self) -> u64 {
        let mut last = self.last_sync.lock();
        last.generation += 1;
        last.at = None;
        last.generation
    }

    /// Record a successful load or push. Ignored for a stale generation.
    pub(crate) fn record(&self, generation: u64, at: DateTime<Utc>) -> bool {
        let mut last = self.last_sync.lock();
        if last.generation != generation {
            return false;
        }
        last.at = Some(at);
        true
    }

    pub(crate) fn begin(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlight(self)
    }
}

/// Marks a load or push as in flight until dropped.
pub(crate) struct InFlight<'a>(&'a SyncStatus);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle to the push task of one bound user.
pub(crate) struct SyncWorker {
    latest: watch::Sender<Option<CartLines>>,
    cancel: CancellationToken,
}

impl SyncWorker {
    /// Spawn the push task for `user_id`.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn(
        user_id: UserId,
        api: Arc<dyn CartApi>,
        status: Arc<SyncStatus>,
        debounce: Duration,
    ) -> Self {
        let (latest, pending) = watch::channel(None);
        let cancel = CancellationToken::new();
        let generation = status.generation();

        let task = PushTask {
            api,
            status,
            generation,
            debounce,
            pending,
            cancel: cancel.clone(),
        };
        tokio::spawn(
            task.run()
                .instrument(tracing::debug_span!("cart_sync", user_id = %user_id)),
        );

        Self { latest, cancel }
    }

    /// Queue `items` as the state to push, replacing any pending state.
    pub(crate) fn publish(&self, items: CartLines) {
        self.latest.send_replace(Some(items));
    }

    /// Forget the pending state, if any, without pushing it.
    pub(crate) fn discard_pending(&self) {
        self.latest.send_replace(None);
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PushTask {
    api: Arc<dyn CartApi>,
    status: Arc<SyncStatus>,
    generation: u64,
    debounce: Duration,
    pending: watch::Receiver<Option<CartLines>>,
    cancel: CancellationToken,
}

impl PushTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = self.pending.changed() => if changed.is_err() { break },
            }

            if !self.quiet_period().await {
                break;
            }

            let Some(items) = self.pending.borrow_and_update().clone() else {
                continue;
            };
            if !self.push(&items).await {
                break;
            }
        }
        tracing::debug!("Cart sync stopped");
    }

    /// Wait until no new state arrives for the debounce window.
    ///
    /// Returns `false` when the worker was cancelled meanwhile.
    async fn quiet_period(&mut self) -> bool {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return false,
                changed = self.pending.changed() => if changed.is_err() { return false },
                () = tokio::time::sleep(self.debounce) => return true,
            }
        }
    }

    /// Push one state. Returns `false` when cancelled mid-flight.
    async fn push(&self, items: &CartLines) -> bool {
        let _in_flight = self.status.begin();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!("Dropped in-flight cart push");
                false
            }
            result = self.api.save_cart(items) => {
                match result {
                    Ok(()) => {
                        if self.status.record(self.generation, Utc::now()) {
                            tracing::debug!(lines = items.len(), "Cart pushed");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to sync cart to server"),
                }
                !self.cancel.is_cancelled()
            }
        }
    }
}
