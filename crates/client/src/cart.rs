//! The client-side cart session.
//!
//! [`CartSession`] owns the local cart lines and the user they belong to.
//! All operations are synchronous and cheap; when a user is bound, each
//! mutation also hands the new item list to a background sync task that
//! pushes it to the server after a quiet period.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::instrument;

use essence_core::{CartKey, CartLines, Price, ProductId, ProductRef, UserId};

use crate::api::CartApi;
use crate::config::ClientConfig;
use crate::snapshot::CartSnapshot;
use crate::sync::{SyncStatus, SyncWorker};

/// What [`CartSession::load_from_server`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The server cart replaced the local items.
    Applied,
    /// No user is bound; nothing was fetched.
    Unbound,
    /// The fetch failed; local items were kept.
    Failed,
    /// The bound user changed while the fetch was in flight; the result was
    /// dropped.
    Superseded,
}

/// What [`CartSession::sync_to_server`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server accepted the current items.
    Pushed,
    /// No user is bound; nothing was sent.
    Unbound,
    /// The push failed; local items were kept and the error was logged.
    Failed,
}

/// A shopper's cart, shared through cheap clones.
#[derive(Clone)]
pub struct CartSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: Arc<dyn CartApi>,
    debounce: Duration,
    status: Arc<SyncStatus>,
    state: Mutex<CartState>,
}

struct CartState {
    user_id: Option<UserId>,
    items: CartLines,
    /// Incremented by every local mutation.
    mutations: u64,
    worker: Option<SyncWorker>,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CartSession")
            .field("user_id", &state.user_id)
            .field("items", &state.items)
            .field("syncing", &self.inner.status.is_syncing())
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// An empty, anonymous cart syncing through `api`.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, config: &ClientConfig) -> Self {
        Self::from_snapshot(api, config, CartSnapshot::default())
    }

    /// Restore a session from a persisted snapshot.
    ///
    /// No sync task runs until [`set_user_id`](Self::set_user_id) binds a
    /// user. Binding the snapshot's own user keeps the restored items.
    #[must_use]
    pub fn from_snapshot(api: Arc<dyn CartApi>, config: &ClientConfig, snapshot: CartSnapshot) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                debounce: config.sync_debounce,
                status: Arc::new(SyncStatus::default()),
                state: Mutex::new(CartState {
                    user_id: snapshot.user_id,
                    items: snapshot.items,
                    mutations: 0,
                    worker: None,
                }),
            }),
        }
    }

    /// The state to persist.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        let state = self.inner.state.lock();
        CartSnapshot {
            user_id: state.user_id,
            items: state.items.clone(),
        }
    }

    /// The bound user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.inner.state.lock().user_id
    }

    /// A copy of the current lines.
    #[must_use]
    pub fn items(&self) -> CartLines {
        self.inner.state.lock().items.clone()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner.state.lock().items.item_count()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.inner.state.lock().items.total()
    }

    /// Whether a load or push is in flight.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.inner.status.is_syncing()
    }

    /// When the cart last loaded from or pushed to the server.
    #[must_use]
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.status.last_sync_time()
    }

    /// Add `quantity` of `product`, merging with an existing line of the
    /// same product and size.
    pub fn add_item(&self, product: ProductRef, quantity: NonZeroU32, selected_size: Option<String>) {
        self.mutate(|items| {
            items.add(product, quantity, selected_size);
            true
        });
    }

    /// Remove the line for `product_id` and `selected_size`.
    ///
    /// Returns `false` when no such line exists.
    pub fn remove_item(&self, product_id: ProductId, selected_size: Option<&str>) -> bool {
        self.mutate(|items| items.remove(CartKey::new(product_id, selected_size)))
    }

    /// Set the quantity of the line for `product_id` and `selected_size`.
    ///
    /// Returns `false` when no such line exists.
    pub fn update_quantity(
        &self,
        product_id: ProductId,
        selected_size: Option<&str>,
        quantity: NonZeroU32,
    ) -> bool {
        self.mutate(|items| items.update_quantity(CartKey::new(product_id, selected_size), quantity))
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.mutate(|items| {
            items.clear();
            true
        });
    }

    /// Apply a mutation and queue a push when it changed something.
    fn mutate(&self, f: impl FnOnce(&mut CartLines) -> bool) -> bool {
        let mut state = self.inner.state.lock();
        let changed = f(&mut state.items);
        if changed {
            state.mutations += 1;
            if let Some(worker) = &state.worker {
                worker.publish(state.items.clone());
            }
        }
        changed
    }

    /// Bind the cart to `user_id`, or unbind it with `None`.
    ///
    /// Unbinding clears the items. Binding a different user starts from an
    /// empty cart; binding the user the items already belong to keeps them.
    /// Either way the previous user's sync task is cancelled, dropping any
    /// pending or in-flight push.
    ///
    /// # Panics
    ///
    /// Binding a user spawns the sync task, which panics outside a Tokio
    /// runtime.
    #[instrument(skip(self))]
    pub fn set_user_id(&self, user_id: Option<UserId>) {
        let mut state = self.inner.state.lock();

        let Some(id) = user_id else {
            state.worker = None;
            state.user_id = None;
            state.items.clear();
            self.inner.status.rebind();
            tracing::debug!("Cart unbound");
            return;
        };

        if state.user_id == Some(id) {
            if state.worker.is_none() {
                state.worker = Some(self.spawn_worker(id));
            }
            return;
        }

        state.worker = None;
        state.user_id = Some(id);
        state.items.clear();
        self.inner.status.rebind();
        state.worker = Some(self.spawn_worker(id));
        tracing::debug!(user_id = %id, "Cart bound");
    }

    fn spawn_worker(&self, user_id: UserId) -> SyncWorker {
        SyncWorker::spawn(
            user_id,
            Arc::clone(&self.inner.api),
            Arc::clone(&self.inner.status),
            self.inner.debounce,
        )
    }

    /// Stop syncing without touching the items or the bound user.
    ///
    /// Pending and in-flight pushes are dropped. Binding the same user again
    /// restarts the sync task.
    pub fn shutdown(&self) {
        self.inner.state.lock().worker = None;
    }

    /// Replace the local items with the bound user's server cart.
    ///
    /// Never fails: a failed fetch keeps the local items, and a result that
    /// arrives after the user changed is dropped.
    #[instrument(skip(self))]
    pub async fn load_from_server(&self) -> LoadOutcome {
        let (generation, mutations) = {
            let state = self.inner.state.lock();
            if state.user_id.is_none() {
                return LoadOutcome::Unbound;
            }
            (self.inner.status.generation(), state.mutations)
        };

        let fetched = {
            let _in_flight = self.inner.status.begin();
            self.inner.api.fetch_cart().await
        };

        let items = match fetched {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cart from server, keeping local items");
                return LoadOutcome::Failed;
            }
        };

        let mut state = self.inner.state.lock();
        if self.inner.status.generation() != generation {
            tracing::debug!("User changed during cart load, dropping result");
            return LoadOutcome::Superseded;
        }

        state.items = items;
        // The server already holds the loaded state. Only an edit that raced
        // the fetch leaves a push queued, and that push now has to carry the
        // loaded state instead.
        if let Some(worker) = &state.worker {
            if state.mutations == mutations {
                worker.discard_pending();
            } else {
                worker.publish(state.items.clone());
            }
        }
        self.inner.status.record(generation, Utc::now());
        tracing::debug!(lines = state.items.len(), "Cart loaded from server");
        LoadOutcome::Applied
    }

    /// Push the current items now, bypassing the debounce.
    ///
    /// Never fails: a rejected push is logged and reported as
    /// [`SyncOutcome::Failed`], leaving the last sync time untouched.
    #[instrument(skip(self))]
    pub async fn sync_to_server(&self) -> SyncOutcome {
        let (generation, items) = {
            let state = self.inner.state.lock();
            if state.user_id.is_none() {
                return SyncOutcome::Unbound;
            }
            (self.inner.status.generation(), state.items.clone())
        };

        let pushed = {
            let _in_flight = self.inner.status.begin();
            self.inner.api.save_cart(&items).await
        };
        if let Err(e) = pushed {
            tracing::warn!(error = %e, "Failed to sync cart to server");
            return SyncOutcome::Failed;
        }
        self.inner.status.record(generation, Utc::now());
        SyncOutcome::Pushed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::{ClientError, Result};
    use async_trait::async_trait;
    use serde_json::json;

    /// Records pushes; fetches return `server` or fail when it is `None`.
    #[derive(Default)]
    struct FakeApi {
        server: Mutex<Option<CartLines>>,
        pushes: Mutex<Vec<CartLines>>,
        fetches: Mutex<usize>,
        latency: Duration,
        reject_pushes: bool,
    }

    impl FakeApi {
        fn slow(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }

        fn rejecting() -> Self {
            Self {
                reject_pushes: true,
                ..Self::default()
            }
        }

        fn pushes(&self) -> Vec<CartLines> {
            self.pushes.lock().clone()
        }
    }

    #[async_trait]
    impl CartApi for FakeApi {
        async fn fetch_cart(&self) -> Result<CartLines> {
            *self.fetches.lock() += 1;
            tokio::time::sleep(self.latency).await;
            self.server.lock().clone().ok_or(ClientError::Status {
                status: 500,
                message: "Internal server error".to_owned(),
            })
        }

        async fn save_cart(&self, items: &CartLines) -> Result<()> {
            tokio::time::sleep(self.latency).await;
            if self.reject_pushes {
                return Err(ClientError::Status {
                    status: 503,
                    message: "Service unavailable".to_owned(),
                });
            }
            self.pushes.lock().push(items.clone());
            Ok(())
        }
    }

    fn product(id: &str, name: &str, price: u32) -> ProductRef {
        serde_json::from_value(json!({ "_id": id, "name": name, "price": price })).unwrap()
    }

    fn rose() -> ProductRef {
        product("65f1a2b3c4d5e6f7a8b9c0d1", "Midnight Rose", 100)
    }

    fn cedar() -> ProductRef {
        product("65f1a2b3c4d5e6f7a8b9c0d2", "Cedar Noir", 80)
    }

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn session(api: &Arc<FakeApi>) -> CartSession {
        let api: Arc<dyn CartApi> = Arc::clone(api) as Arc<dyn CartApi>;
        CartSession::new(api, &ClientConfig::default())
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_cart_never_syncs() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);

        cart.add_item(rose(), qty(2), None);
        cart.add_item(rose(), qty(1), None);
        wait(2_000).await;

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Price::from_units(300));
        assert!(api.pushes().is_empty());
        assert_eq!(cart.sync_to_server().await, SyncOutcome::Unbound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_mutations_pushes_once() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));

        cart.add_item(rose(), qty(1), None);
        wait(100).await;
        cart.add_item(cedar(), qty(1), None);
        wait(100).await;
        cart.update_quantity(rose().id, None, qty(3));
        wait(600).await;

        let pushes = api.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0], cart.items());
        assert_eq!(pushes[0].item_count(), 4);
        assert!(cart.last_sync_time().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_mutation_restarts_quiet_period() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));

        cart.add_item(rose(), qty(1), None);
        wait(400).await;
        cart.add_item(rose(), qty(1), None);
        wait(400).await;
        assert!(api.pushes().is_empty());

        wait(200).await;
        assert_eq!(api.pushes().len(), 1);
        assert_eq!(api.pushes()[0].item_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_after_a_push_push_again() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));

        cart.add_item(rose(), qty(1), None);
        wait(600).await;
        assert!(cart.remove_item(rose().id, None));
        assert!(!cart.remove_item(cedar().id, None));
        wait(600).await;

        let pushes = api.pushes();
        assert_eq!(pushes.len(), 2);
        assert!(pushes[1].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbind_clears_and_drops_pending_push() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);

        cart.set_user_id(None);
        assert!(cart.items().is_empty());
        assert_eq!(cart.user_id(), None);

        wait(2_000).await;
        assert!(api.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_cancels_in_flight_push() {
        let api = Arc::new(FakeApi::slow(Duration::from_secs(1)));
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);

        wait(600).await;
        assert!(cart.is_syncing());

        cart.set_user_id(Some(UserId::generate()));
        wait(2_000).await;

        assert!(api.pushes().is_empty());
        assert!(!cart.is_syncing());
        assert!(cart.items().is_empty());
        assert_eq!(cart.last_sync_time(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinding_same_user_keeps_items_and_worker() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        let ava = UserId::generate();
        cart.set_user_id(Some(ava));
        cart.add_item(rose(), qty(1), None);

        cart.set_user_id(Some(ava));
        wait(600).await;

        assert_eq!(cart.item_count(), 1);
        assert_eq!(api.pushes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_syncing_but_keeps_items() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        let ava = UserId::generate();
        cart.set_user_id(Some(ava));
        cart.add_item(rose(), qty(1), None);

        cart.shutdown();
        wait(2_000).await;
        assert!(api.pushes().is_empty());
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.user_id(), Some(ava));

        cart.set_user_id(Some(ava));
        cart.add_item(cedar(), qty(1), None);
        wait(600).await;
        assert_eq!(api.pushes().len(), 1);
        assert_eq!(api.pushes()[0].item_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_replaces_local_items() {
        let api = Arc::new(FakeApi::default());
        let mut server = CartLines::new();
        server.add(cedar(), qty(2), Some("50ml".to_owned()));
        *api.server.lock() = Some(server.clone());

        let cart = session(&api);
        assert_eq!(cart.load_from_server().await, LoadOutcome::Unbound);
        assert_eq!(*api.fetches.lock(), 0);

        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);
        assert_eq!(cart.load_from_server().await, LoadOutcome::Applied);
        assert_eq!(cart.items(), server);
        assert!(cart.last_sync_time().is_some());
        assert!(!cart.is_syncing());

        // The local edit made before the load is superseded, not pushed.
        wait(2_000).await;
        assert!(api.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_local_items() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);

        assert_eq!(cart.load_from_server().await, LoadOutcome::Failed);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.last_sync_time(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_after_user_switch_is_dropped() {
        let api = Arc::new(FakeApi::slow(Duration::from_secs(1)));
        let mut server = CartLines::new();
        server.add(cedar(), qty(1), None);
        *api.server.lock() = Some(server);

        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        let loading = tokio::spawn({
            let cart = cart.clone();
            async move { cart.load_from_server().await }
        });

        wait(100).await;
        assert!(cart.is_syncing());
        cart.set_user_id(None);

        assert_eq!(loading.await.unwrap(), LoadOutcome::Superseded);
        assert!(cart.items().is_empty());
        assert_eq!(cart.last_sync_time(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_load_pushes_loaded_state() {
        let api = Arc::new(FakeApi::slow(Duration::from_millis(300)));
        let mut server = CartLines::new();
        server.add(cedar(), qty(1), None);
        *api.server.lock() = Some(server.clone());

        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        let loading = tokio::spawn({
            let cart = cart.clone();
            async move { cart.load_from_server().await }
        });

        wait(100).await;
        cart.add_item(rose(), qty(1), None);
        assert_eq!(loading.await.unwrap(), LoadOutcome::Applied);

        wait(2_000).await;
        assert_eq!(api.pushes().last(), Some(&server));
        assert_eq!(cart.items(), server);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_to_server_pushes_immediately() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);

        assert_eq!(cart.sync_to_server().await, SyncOutcome::Pushed);
        assert_eq!(api.pushes().len(), 1);
        assert!(cart.last_sync_time().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_sync_to_server_keeps_items() {
        let api = Arc::new(FakeApi::rejecting());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(2), None);

        assert_eq!(cart.sync_to_server().await, SyncOutcome::Failed);
        assert!(api.pushes().is_empty());
        assert!(!cart.is_syncing());
        assert!(cart.last_sync_time().is_none());
        assert_eq!(cart.item_count(), 2);

        // The debounced worker hits the same failure and stays quiet about it.
        wait(2_000).await;
        assert!(cart.last_sync_time().is_none());
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_restores_for_same_user_only() {
        let api = Arc::new(FakeApi::default());
        let ava = UserId::generate();
        let cart = session(&api);
        cart.set_user_id(Some(ava));
        cart.add_item(rose(), qty(2), Some("50ml".to_owned()));
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.user_id, Some(ava));

        let dyn_api: Arc<dyn CartApi> = Arc::clone(&api) as Arc<dyn CartApi>;
        let config = ClientConfig::default();
        let restored = CartSession::from_snapshot(Arc::clone(&dyn_api), &config, snapshot.clone());
        restored.set_user_id(Some(ava));
        assert_eq!(restored.item_count(), 2);

        let other = CartSession::from_snapshot(dyn_api, &config, snapshot);
        other.set_user_id(Some(UserId::generate()));
        assert!(other.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_and_syncs() {
        let api = Arc::new(FakeApi::default());
        let cart = session(&api);
        cart.set_user_id(Some(UserId::generate()));
        cart.add_item(rose(), qty(1), None);
        cart.add_item(cedar(), qty(1), None);

        cart.clear();
        wait(600).await;

        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total(), Price::from_units(0));
        assert_eq!(api.pushes(), vec![CartLines::new()]);
    }
}
