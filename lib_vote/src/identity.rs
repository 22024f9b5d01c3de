//! # Identity Provider
//!
//! Hands out the pseudonymous voter id. The id is generated once, stored under
//! a fixed key and reused until explicitly cleared. It only attributes votes;
//! it is not a security token, so a random-plus-timestamp scheme is enough.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::Rng;

use crate::storage::KeyValueStorage;

/// Storage key of the identity string.
pub const IDENTITY_KEY: &str = "cat-voting-user-id";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 9;

/// Lazily creates and remembers the voter identity.
pub struct IdentityProvider {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    // Session fallback used when storage cannot hold the id.
    session: Mutex<Option<String>>,
}

impl IdentityProvider {
    /// Provider backed by `storage` under the default key.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, IDENTITY_KEY)
    }

    /// Provider backed by `storage` under `key`.
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            session: Mutex::new(None),
        }
    }

    /// Returns the stored identity, generating and storing one if absent.
    ///
    /// Storage failures never surface: the generated id is kept in memory for
    /// the rest of the session instead.
    pub fn get_identity(&self) -> String {
        match self.storage.get(&self.key) {
            Ok(Some(existing)) if !existing.trim().is_empty() => return existing,
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored identity"),
        }

        let mut session = self.session.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(id) = session.as_ref() {
            return id.clone();
        }

        let id = generate_identity();
        match self.storage.set(&self.key, &id) {
            Ok(()) => tracing::info!(identity = %id, "Generated new voter identity"),
            Err(e) => tracing::warn!(error = %e, "Identity kept for this session only"),
        }
        *session = Some(id.clone());
        id
    }

    /// Forgets the identity; the next `get_identity` generates a new one.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to remove stored identity");
        }
        *self.session.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// `user_<9 random base36 chars>_<unix millis in base36>`.
pub fn generate_identity() -> String {
    let mut rng = rand::rng();
    let random: String = (0..RANDOM_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    format!("user_{}_{}", random, to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn generated_identity_has_expected_shape() {
        let id = generate_identity();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert_eq!(parts[1].len(), RANDOM_LEN);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_identity(), id);
    }

    #[test]
    fn identity_is_stable_and_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let provider = IdentityProvider::new(storage.clone());

        let first = provider.get_identity();
        assert_eq!(provider.get_identity(), first);
        assert_eq!(storage.get(IDENTITY_KEY).unwrap().as_deref(), Some(first.as_str()));

        // A fresh provider over the same storage sees the same id.
        let again = IdentityProvider::new(storage);
        assert_eq!(again.get_identity(), first);
    }

    #[test]
    fn existing_identity_is_reused() {
        let storage = Arc::new(MemoryStorage::with_entry(IDENTITY_KEY, "user_preset_1"));
        let provider = IdentityProvider::new(storage);
        assert_eq!(provider.get_identity(), "user_preset_1");
    }

    #[test]
    fn clear_generates_a_new_identity() {
        let storage = Arc::new(MemoryStorage::new());
        let provider = IdentityProvider::new(storage.clone());
        let first = provider.get_identity();

        provider.clear();
        assert_eq!(storage.get(IDENTITY_KEY).unwrap(), None);
        assert_ne!(provider.get_identity(), first);
    }

    #[test]
    fn unwritable_storage_keeps_a_session_identity() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_reject_writes(true);
        let provider = IdentityProvider::new(storage.clone());

        let first = provider.get_identity();
        assert_eq!(provider.get_identity(), first);
        assert_eq!(storage.get(IDENTITY_KEY).unwrap(), None);
    }
}
