//! # Core Store Module
//!
//! The voting store and what it needs to run.
//!
//! ## Core Components:
//!
//! - **`store`**: `VotingStore`, the single writer of items, votes, scores,
//!   request flags and the notification. It runs two independent state
//!   machines (fetch, and vote per item) over one container.
//!
//! - **`listeners`**: snapshot fan-out to subscribed observers after every
//!   committed mutation.
//!
//! - **`notifier`**: the one-message notification slot with an expiry
//!   deadline and a cancellable timer.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Observer registration and delivery.
pub mod listeners;
/// Expiring notification slot.
pub(crate) mod notifier;
/// The voting store.
pub mod store;

// --- Public API Re-exports ---
pub use listeners::ListenerId;
pub use store::{StoreOptions, StoreSnapshot, VoteOutcome, VotingStore};
