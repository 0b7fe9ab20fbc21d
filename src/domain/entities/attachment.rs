//! Encrypted attachment references.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque location of an attachment's ciphertext (URL or blob id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLocator(String);

impl ContentLocator {
    /// Creates a locator from any string-like input.
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentLocator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Stable identity of an attachment's ciphertext.
///
/// Used as the memory cache key. Plaintext identity is never used because
/// decryption keys differ per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CipherFingerprint(String);

impl CipherFingerprint {
    /// Creates a fingerprint from any string-like input.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }

    /// Derives a fingerprint by hashing the ciphertext locator.
    #[must_use]
    pub fn from_locator(locator: &ContentLocator) -> Self {
        Self::digest(locator.as_str().as_bytes())
    }

    /// Derives a fingerprint by hashing the ciphertext bytes themselves.
    #[must_use]
    pub fn from_ciphertext(ciphertext: &[u8]) -> Self {
        Self::digest(ciphertext)
    }

    fn digest(input: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(input);
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CipherFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CipherFingerprint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of the symmetric key an attachment was encrypted with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    /// Creates a key identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Initialization vector as carried on the message (base64 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iv(String);

impl Iv {
    /// Creates an IV from its encoded form.
    #[must_use]
    pub fn new(iv: impl Into<String>) -> Self {
        Self(iv.into())
    }

    /// Returns the encoded IV.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iv {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of the chat message owning an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a message identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An encrypted image attachment belonging to a message.
///
/// Shared behind an `Arc` between the message and the pipeline. Everything
/// except `known_height` is immutable.
pub struct MessageAttachmentRef {
    message_id: MessageId,
    locator: ContentLocator,
    fingerprint: CipherFingerprint,
    key_id: KeyId,
    iv: Iv,
    known_height: AtomicU32,
}

impl MessageAttachmentRef {
    /// Creates a reference whose fingerprint is derived from the locator.
    #[must_use]
    pub fn new(message_id: MessageId, locator: ContentLocator, key_id: KeyId, iv: Iv) -> Self {
        let fingerprint = CipherFingerprint::from_locator(&locator);
        Self::with_fingerprint(message_id, locator, fingerprint, key_id, iv)
    }

    /// Creates a reference with an explicit ciphertext fingerprint.
    #[must_use]
    pub const fn with_fingerprint(
        message_id: MessageId,
        locator: ContentLocator,
        fingerprint: CipherFingerprint,
        key_id: KeyId,
        iv: Iv,
    ) -> Self {
        Self {
            message_id,
            locator,
            fingerprint,
            key_id,
            iv,
            known_height: AtomicU32::new(0),
        }
    }

    /// Sets the height remembered from an earlier session.
    #[must_use]
    pub fn with_known_height(self, height: u32) -> Self {
        self.known_height.store(height, Ordering::Relaxed);
        self
    }

    /// Returns the owning message id.
    #[must_use]
    pub const fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Returns where the ciphertext lives.
    #[must_use]
    pub const fn locator(&self) -> &ContentLocator {
        &self.locator
    }

    /// Returns the ciphertext fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &CipherFingerprint {
        &self.fingerprint
    }

    /// Returns the decryption key identifier.
    #[must_use]
    pub const fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Returns the initialization vector.
    #[must_use]
    pub const fn iv(&self) -> &Iv {
        &self.iv
    }

    /// Returns the materialized height, or 0 if never materialized.
    #[must_use]
    pub fn known_height(&self) -> u32 {
        self.known_height.load(Ordering::Acquire)
    }

    /// Records the materialized height if none is known yet.
    ///
    /// Returns true if this call set the height.
    pub fn record_height(&self, height: u32) -> bool {
        height != 0
            && self
                .known_height
                .compare_exchange(0, height, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }
}

impl PartialEq for MessageAttachmentRef {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id && self.fingerprint == other.fingerprint
    }
}

impl Eq for MessageAttachmentRef {}

impl fmt::Debug for MessageAttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageAttachmentRef")
            .field("message_id", &self.message_id)
            .field("fingerprint", &self.fingerprint)
            .field("key_id", &self.key_id)
            .field("known_height", &self.known_height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(message: &str, locator: &str) -> MessageAttachmentRef {
        MessageAttachmentRef::new(
            MessageId::new(message),
            ContentLocator::new(locator),
            KeyId::new("k1"),
            Iv::new("iv1"),
        )
    }

    #[test]
    fn test_fingerprint_from_locator() {
        let locator = ContentLocator::new("https://files.example.com/images/abc123");
        let fp = CipherFingerprint::from_locator(&locator);
        assert_eq!(fp.as_str().len(), 32);
        assert_eq!(fp, CipherFingerprint::from_locator(&locator));
    }

    #[test]
    fn test_equality_ignores_known_height() {
        let a = attachment("m1", "blob/1");
        let b = attachment("m1", "blob/1").with_known_height(120);
        assert_eq!(a, b);
        assert_ne!(a, attachment("m2", "blob/1"));
        assert_ne!(a, attachment("m1", "blob/2"));
    }

    #[test]
    fn test_record_height_only_once() {
        let a = attachment("m1", "blob/1");
        assert_eq!(a.known_height(), 0);
        assert!(a.record_height(200));
        assert!(!a.record_height(150));
        assert_eq!(a.known_height(), 200);
    }

    #[test]
    fn test_record_height_ignores_zero() {
        let a = attachment("m1", "blob/1");
        assert!(!a.record_height(0));
        assert_eq!(a.known_height(), 0);
    }
}
