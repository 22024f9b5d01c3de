//! # Error Types
//!
//! One `thiserror` enum per concern. Remote failures are turned into store
//! state by `VotingStore`; storage and persistence failures are logged and
//! recovered from. None of them is fatal to the process.

use thiserror::Error;

/// Failure reported by a catalog client call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The server answered with a non-2xx status. `context` names the call,
    /// e.g. "fetch images".
    #[error("Failed to {context}: {status}")]
    Status {
        /// What was being attempted.
        context: &'static str,
        /// The numeric HTTP status.
        status: u16,
    },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("Network error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON shape.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The client was built from an unusable base URL, path or credential.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a `KeyValueStorage` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem error.
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refuses writes (quota exceeded, disabled storage).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure reading or writing the persisted store snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The snapshot could not be read from storage.
    #[error("Failed to read persisted state: {0}")]
    Read(#[source] StorageError),

    /// The stored blob is not a valid snapshot envelope.
    #[error("Persisted state is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The snapshot could not be written.
    #[error("Failed to write persisted state: {0}")]
    Write(#[source] StorageError),
}
