//! # Storage Module
//!
//! Key/value backends standing in for the browser's local storage. The store
//! keeps exactly two keys in here: the persisted snapshot and the identity.
//!
//! - **`file`**: one file per key under a directory, survives restarts.
//! - **`memory`**: process-local map for tests and throwaway sessions.

use crate::error::StorageError;

/// Directory-backed storage.
pub mod file;
/// In-process storage.
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// A string key/value store.
///
/// Calls are synchronous and short; callers treat every error as
/// recoverable.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value under `key`, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
