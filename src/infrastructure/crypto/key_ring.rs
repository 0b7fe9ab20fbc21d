//! In-memory store of symmetric attachment keys.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::entities::KeyId;
use crate::domain::errors::DecryptError;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric key material wiped on drop.
pub type SymmetricKey = Zeroizing<[u8; KEY_LEN]>;

/// Maps key identifiers to symmetric keys.
///
/// Key bytes are zeroized when removed or when the ring is dropped.
#[derive(Default)]
pub struct KeyRing {
    keys: RwLock<HashMap<KeyId, SymmetricKey>>,
}

impl KeyRing {
    /// Creates an empty key ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a key, replacing any previous key with the same id.
    pub fn insert(&self, key_id: KeyId, key: [u8; KEY_LEN]) {
        debug!(key_id = %key_id, "Key added to key ring");
        self.keys.write().insert(key_id, Zeroizing::new(key));
    }

    /// Stores a hex-encoded key.
    ///
    /// # Errors
    /// Returns error if the input is not 32 bytes of hex.
    pub fn insert_hex(&self, key_id: KeyId, hex_key: &str) -> Result<(), DecryptError> {
        let decoded = Zeroizing::new(
            hex::decode(hex_key.trim()).map_err(|e| DecryptError::InvalidKey(e.to_string()))?,
        );
        let key: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            DecryptError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", decoded.len()))
        })?;
        self.insert(key_id, key);
        Ok(())
    }

    /// Returns a copy of the key for `key_id`.
    #[must_use]
    pub fn get(&self, key_id: &KeyId) -> Option<SymmetricKey> {
        self.keys.read().get(key_id).cloned()
    }

    /// Returns true if a key is stored under `key_id`.
    #[must_use]
    pub fn contains(&self, key_id: &KeyId) -> bool {
        self.keys.read().contains_key(key_id)
    }

    /// Removes one key.
    pub fn remove(&self, key_id: &KeyId) {
        self.keys.write().remove(key_id);
    }

    /// Drops every key.
    pub fn clear(&self) {
        let mut keys = self.keys.write();
        let count = keys.len();
        keys.clear();
        debug!(count, "Key ring cleared");
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &self.keys.read().len())
            .finish()
    }
}
