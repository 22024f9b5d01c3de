//! # Voting Store
//!
//! The authoritative client-side view of the catalog batch and the user's
//! voting state. One instance per process, shared by cloning (the handle is
//! an `Arc`).
//!
//! ## Fetch
//! `Idle -> Loading -> {Settled, Failed}`. Every fetch takes a new generation
//! number; a response that arrives after a newer fetch was started is dropped
//! without touching state, and `is_loading` stays set until the newest fetch
//! settles. A successful fetch replaces the item list wholesale and leaves
//! votes and scores alone.
//!
//! ## Vote
//! Per item: `Unvoted -> Submitting -> {Voted, Unvoted + error}`. An item with
//! a recorded vote is never submitted again, and an item with a submission in
//! flight rejects a second one. Votes on different items run concurrently.
//! The vote and score are written only after the remote acknowledges.
//!
//! ## Commit
//! Every mutation goes through `update`: the state lock is held for the
//! synchronous change and the write of the durable subset through the
//! `PersistenceBridge` (never across an await), so concurrent commits reach
//! storage in order. Listeners receive a snapshot after the lock is released.
//! A failed write is logged and otherwise ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::core::listeners::{ListenerId, Listeners};
use crate::core::notifier::{ExpiryTicket, NotificationSlot};
use crate::error::RemoteError;
use crate::identity::IdentityProvider;
use crate::model::{CatalogClient, Direction, FailedAction, Item, RemoteVote, Theme};
use crate::persist::{PersistedState, PersistenceBridge};
use crate::storage::KeyValueStorage;

/// Message raised when the host reports loss of connectivity.
pub const OFFLINE_MESSAGE: &str =
    "No internet connection detected. Please check your network and try again.";

/// Tunables for a `VotingStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Batch size requested by `fetch_items`.
    pub fetch_limit: u32,
    /// How long a notification stays visible.
    pub notification_ttl: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            fetch_limit: 10,
            notification_ttl: Duration::from_secs(5),
        }
    }
}

/// Read-only copy of everything a view can observe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreSnapshot {
    /// Current batch.
    pub items: Vec<Item>,
    /// Votes cast by this user.
    pub user_votes: BTreeMap<String, Direction>,
    /// Accumulated scores.
    pub scores: BTreeMap<String, i64>,
    /// Theme preference.
    pub theme: Theme,
    /// A fetch is outstanding.
    pub is_loading: bool,
    /// Message of the last failed operation.
    pub error: Option<String>,
    /// Which operation failed last.
    pub action: Option<FailedAction>,
    /// Visible notification, if any.
    pub network_error: Option<String>,
    /// Items with a vote submission in flight.
    pub pending_votes: BTreeSet<String>,
}

/// What a `vote` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The remote acknowledged and the vote and score were recorded.
    Applied,
    /// The item already had a vote; nothing was sent.
    AlreadyVoted,
    /// A submission for the item is still in flight; nothing was sent.
    InFlight,
    /// The remote call failed; the error was recorded and the item stays votable.
    Failed(RemoteError),
}

#[derive(Debug, Default)]
struct StoreState {
    items: Vec<Item>,
    durable: PersistedState,
    is_loading: bool,
    last_error: Option<String>,
    last_failed_action: Option<FailedAction>,
    notification: NotificationSlot,
    in_flight: BTreeSet<String>,
    fetch_generation: u64,
    commit_seq: u64,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            items: self.items.clone(),
            user_votes: self.durable.user_votes.clone(),
            scores: self.durable.scores.clone(),
            theme: self.durable.theme,
            is_loading: self.is_loading,
            error: self.last_error.clone(),
            action: self.last_failed_action,
            network_error: self.notification.message().map(str::to_string),
            pending_votes: self.in_flight.clone(),
        }
    }

    fn record_failure(&mut self, action: FailedAction, message: &str, ttl: Duration) -> ExpiryTicket {
        self.last_error = Some(message.to_string());
        self.last_failed_action = Some(action);
        self.notification.raise(message, ttl)
    }
}

/// Result of a state transition passed to `update`.
enum Commit<R> {
    Changed(R),
    Unchanged(R),
}

struct Shared {
    state: Mutex<StoreState>,
    listeners: Listeners,
    client: Arc<dyn CatalogClient>,
    bridge: PersistenceBridge,
    identity: IdentityProvider,
    options: StoreOptions,
}

/// # Voting Store
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct VotingStore {
    inner: Arc<Shared>,
}

impl VotingStore {
    /// Builds a store with default options and rehydrates persisted state.
    pub fn new(
        client: Arc<dyn CatalogClient>,
        bridge: PersistenceBridge,
        identity: IdentityProvider,
    ) -> Self {
        Self::with_options(client, bridge, identity, StoreOptions::default())
    }

    /// Builds a store and rehydrates persisted state. Unreadable snapshots
    /// start the store empty.
    pub fn with_options(
        client: Arc<dyn CatalogClient>,
        bridge: PersistenceBridge,
        identity: IdentityProvider,
        options: StoreOptions,
    ) -> Self {
        let durable = bridge.load();
        let state = StoreState {
            durable,
            ..StoreState::default()
        };
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(state),
                listeners: Listeners::default(),
                client,
                bridge,
                identity,
                options,
            }),
        }
    }

    /// Builds a store whose snapshot and identity share one storage backend.
    pub fn from_storage(
        client: Arc<dyn CatalogClient>,
        storage: Arc<dyn KeyValueStorage>,
        options: StoreOptions,
    ) -> Self {
        let bridge = PersistenceBridge::new(Arc::clone(&storage));
        let identity = IdentityProvider::new(storage);
        Self::with_options(client, bridge, identity, options)
    }

    // --- Accessors ---

    /// Full copy of the observable state.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().snapshot()
    }

    /// Current batch.
    pub fn items(&self) -> Vec<Item> {
        self.lock().items.clone()
    }

    /// All recorded votes.
    pub fn user_votes(&self) -> BTreeMap<String, Direction> {
        self.lock().durable.user_votes.clone()
    }

    /// The user's vote on `item_id`, if any.
    pub fn user_vote(&self, item_id: &str) -> Option<Direction> {
        self.lock().durable.user_votes.get(item_id).copied()
    }

    /// All scores.
    pub fn scores(&self) -> BTreeMap<String, i64> {
        self.lock().durable.scores.clone()
    }

    /// Score of `item_id`; unknown items score 0.
    pub fn score(&self, item_id: &str) -> i64 {
        self.lock().durable.scores.get(item_id).copied().unwrap_or(0)
    }

    /// Theme preference.
    pub fn theme(&self) -> Theme {
        self.lock().durable.theme
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    /// Message of the last failed fetch or vote.
    pub fn error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Which operation failed last.
    pub fn action(&self) -> Option<FailedAction> {
        self.lock().last_failed_action
    }

    /// Visible notification, if any.
    pub fn network_error(&self) -> Option<String> {
        self.lock().notification.message().map(str::to_string)
    }

    /// Whether a vote for `item_id` is in flight.
    pub fn is_voting(&self, item_id: &str) -> bool {
        self.lock().in_flight.contains(item_id)
    }

    /// The identity votes are attributed to.
    pub fn identity(&self) -> String {
        self.inner.identity.get_identity()
    }

    // --- Fetch ---

    /// Fetches a new batch and replaces the item list with it.
    pub async fn fetch_items(&self) {
        let limit = self.inner.options.fetch_limit;
        let generation = self.update(|s| {
            s.fetch_generation += 1;
            s.is_loading = true;
            s.last_error = None;
            s.last_failed_action = None;
            Commit::Changed(s.fetch_generation)
        });
        tracing::debug!(generation, limit, "Fetching catalog batch");

        let result = self.inner.client.fetch_batch(limit).await;
        let ttl = self.inner.options.notification_ttl;

        let ticket = self.update(|s| {
            if s.fetch_generation != generation {
                tracing::debug!(
                    generation,
                    latest = s.fetch_generation,
                    "Dropping response of a superseded fetch"
                );
                return Commit::Unchanged(None);
            }
            s.is_loading = false;
            match result {
                Ok(items) => {
                    tracing::debug!(count = items.len(), "Catalog batch loaded");
                    s.items = items;
                    Commit::Changed(None)
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, "Catalog fetch failed");
                    Commit::Changed(Some(s.record_failure(FailedAction::Fetch, &message, ttl)))
                }
            }
        });

        if let Some(ticket) = ticket {
            self.schedule_expiry(ticket);
        }
    }

    /// Same as `fetch_items`; valid with items already present.
    pub async fn refresh_items(&self) {
        self.fetch_items().await;
    }

    /// Fetches only when no items are loaded and no fetch is running.
    /// Returns whether a fetch was performed.
    pub async fn fetch_if_empty(&self) -> bool {
        let should_fetch = {
            let s = self.lock();
            s.items.is_empty() && !s.is_loading
        };
        if should_fetch {
            self.fetch_items().await;
        }
        should_fetch
    }

    // --- Vote ---

    /// Casts the user's vote on `item_id`.
    ///
    /// Already-voted items and items with a submission in flight are left
    /// alone and nothing is sent. Otherwise the vote is submitted and, once
    /// acknowledged, recorded together with the score change. On failure the
    /// error is recorded, a notification is raised and the item stays votable.
    pub async fn vote(&self, item_id: &str, direction: Direction) -> VoteOutcome {
        let admitted = self.update(|s| {
            if s.durable.user_votes.contains_key(item_id) {
                return Commit::Unchanged(Err(VoteOutcome::AlreadyVoted));
            }
            if !s.in_flight.insert(item_id.to_string()) {
                return Commit::Unchanged(Err(VoteOutcome::InFlight));
            }
            s.last_error = None;
            s.last_failed_action = None;
            Commit::Changed(Ok(()))
        });
        if let Err(outcome) = admitted {
            tracing::debug!(item = item_id, ?outcome, "Vote suppressed");
            return outcome;
        }

        let mut pending = PendingVote::new(self, item_id);
        let identity = self.inner.identity.get_identity();
        let result = self
            .inner
            .client
            .submit_vote(item_id, &identity, direction)
            .await;
        pending.disarm();

        let ttl = self.inner.options.notification_ttl;
        let (outcome, ticket) = self.update(|s| {
            s.in_flight.remove(item_id);
            match result {
                Ok(_ack) => {
                    s.durable
                        .user_votes
                        .entry(item_id.to_string())
                        .or_insert(direction);
                    let score = s.durable.scores.entry(item_id.to_string()).or_insert(0);
                    *score = score.saturating_add(direction.value());
                    Commit::Changed((VoteOutcome::Applied, None))
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(item = item_id, error = %message, "Vote submission failed");
                    let ticket = s.record_failure(FailedAction::Vote, &message, ttl);
                    Commit::Changed((VoteOutcome::Failed(e), Some(ticket)))
                }
            }
        });

        if let Some(ticket) = ticket {
            self.schedule_expiry(ticket);
        }
        outcome
    }

    /// The remote vote history of this user. Read-only; store state is not
    /// touched whatever the result.
    pub async fn vote_history(&self) -> Result<Vec<RemoteVote>, RemoteError> {
        let identity = self.inner.identity.get_identity();
        self.inner.client.fetch_votes(&identity).await
    }

    // --- Errors and notifications ---

    /// Clears the last error without touching the notification.
    pub fn clear_error(&self) {
        self.update(|s| {
            if s.last_error.is_none() && s.last_failed_action.is_none() {
                return Commit::Unchanged(());
            }
            s.last_error = None;
            s.last_failed_action = None;
            Commit::Changed(())
        });
    }

    /// Shows `message` as the notification, restarting the expiry timer.
    pub fn show_network_error(&self, message: impl Into<String>) {
        let message = message.into();
        let ttl = self.inner.options.notification_ttl;
        let ticket = self.update(|s| Commit::Changed(s.notification.raise(message, ttl)));
        self.schedule_expiry(ticket);
    }

    /// Dismisses the notification.
    pub fn clear_network_error(&self) {
        self.update(|s| {
            if s.notification.clear() {
                Commit::Changed(())
            } else {
                Commit::Unchanged(())
            }
        });
    }

    /// Connectivity hook: offline raises the offline notification, online
    /// dismisses whatever notification is showing.
    pub fn set_online(&self, online: bool) {
        if online {
            self.clear_network_error();
        } else {
            self.show_network_error(OFFLINE_MESSAGE);
        }
    }

    // --- Theme ---

    /// Sets the theme preference.
    pub fn set_theme(&self, theme: Theme) {
        self.update(|s| {
            if s.durable.theme == theme {
                return Commit::Unchanged(());
            }
            s.durable.theme = theme;
            Commit::Changed(())
        });
    }

    /// Flips the theme and returns the new one.
    pub fn toggle_theme(&self) -> Theme {
        self.update(|s| {
            s.durable.theme = s.durable.theme.toggled();
            Commit::Changed(s.durable.theme)
        })
    }

    // --- Observers ---

    /// Registers `listener`, called with a snapshot after every committed
    /// mutation.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreSnapshot) + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(listener))
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    // --- Internals ---

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Applies `f` under the state lock. If it changed anything the snapshot
    /// is written before the lock is released, so writes land in commit
    /// order; listeners are notified after release, tagged with the commit
    /// number so a late delivery never replaces a newer one.
    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> Commit<R>) -> R {
        let (value, delivery) = {
            let mut state = self.lock();
            match f(&mut state) {
                Commit::Unchanged(value) => (value, None),
                Commit::Changed(value) => {
                    state.commit_seq += 1;
                    if let Err(e) = self.inner.bridge.save(&state.durable) {
                        tracing::warn!(error = %e, "Failed to persist store state");
                    }
                    let delivery = (!self.inner.listeners.is_empty())
                        .then(|| (state.commit_seq, state.snapshot()));
                    (value, delivery)
                }
            }
        };

        if let Some((seq, snapshot)) = delivery {
            self.inner.listeners.notify(seq, &snapshot);
        }
        value
    }

    fn expire_notification(&self, seq: u64) {
        self.update(|s| {
            if s.notification.expire(seq) {
                Commit::Changed(())
            } else {
                Commit::Unchanged(())
            }
        });
    }

    /// Clears the notification identified by `ticket` once its TTL elapses,
    /// unless it was replaced or dismissed first. Outside a tokio runtime no
    /// timer runs; the message still stops being visible at its deadline.
    fn schedule_expiry(&self, ticket: ExpiryTicket) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime, notification expires lazily");
            return;
        };
        let store: Weak<Shared> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::select! {
                _ = ticket.token.cancelled() => {}
                _ = tokio::time::sleep(ticket.ttl) => {
                    if let Some(inner) = store.upgrade() {
                        VotingStore { inner }.expire_notification(ticket.seq);
                    }
                }
            }
        });
    }
}

/// Releases the in-flight mark if a vote future is dropped mid-submission,
/// so the item does not stay locked.
struct PendingVote<'a> {
    store: &'a VotingStore,
    item_id: &'a str,
    armed: bool,
}

impl<'a> PendingVote<'a> {
    fn new(store: &'a VotingStore, item_id: &'a str) -> Self {
        Self {
            store,
            item_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingVote<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(item = self.item_id, "Vote abandoned before completion");
            self.store.update(|s| {
                if s.in_flight.remove(self.item_id) {
                    Commit::Changed(())
                } else {
                    Commit::Unchanged(())
                }
            });
        }
    }
}
