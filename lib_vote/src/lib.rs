//! # lib_vote
//!
//! Client-side core of the cat voting platform. It owns the fetched catalog
//! batch, the user's votes and per-item scores, request lifecycle flags and a
//! short-lived error notification, and keeps the durable part of that state
//! across restarts.
//!
//! ## Layout:
//!
//! - **`core`**: the `VotingStore` state container, its listener fan-out and
//!   the expiring notification slot.
//! - **`persist`**: snapshot/rehydrate of the durable subset of the store.
//! - **`identity`**: the stable pseudonymous id used to attribute votes.
//! - **`storage`**: key/value backends (file and in-memory).
//! - **`retrieve`** (feature `retrieve`): the HTTP catalog client.
//! - **`configs`** (feature `configs`): layered configuration.
//! - **`loggers`** (feature `loggers`): tracing subscriber setup.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The voting store and its supporting pieces.
pub mod core;
/// Error types shared across the crate.
pub mod error;
/// Pseudonymous identity provider.
pub mod identity;
/// Catalog data types and the remote client contract.
pub mod model;
/// Durable snapshot of votes, scores and theme.
pub mod persist;
/// Key/value storage backends.
pub mod storage;

/// Layered runtime configuration.
#[cfg(feature = "configs")]
pub mod configs;
/// Tracing subscriber setup and log file housekeeping.
#[cfg(feature = "loggers")]
pub mod loggers;
/// HTTP catalog client.
#[cfg(feature = "retrieve")]
pub mod retrieve;

// --- Public API Re-exports ---
pub use crate::core::{ListenerId, StoreOptions, StoreSnapshot, VoteOutcome, VotingStore};
pub use error::{PersistenceError, RemoteError, StorageError};
pub use identity::IdentityProvider;
pub use model::{CatalogClient, Direction, FailedAction, Item, RemoteVote, Theme, VoteAck};
pub use persist::{PersistedState, PersistenceBridge};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

#[cfg(feature = "configs")]
pub use configs::{load_config, VoteConfig};
#[cfg(feature = "retrieve")]
pub use retrieve::catalog::HttpCatalogClient;
