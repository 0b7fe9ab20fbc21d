//! AES-256-GCM attachment decryption.

use std::borrow::Cow;
use std::sync::Arc;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::entities::{Iv, KeyId};
use crate::domain::errors::DecryptError;
use crate::domain::ports::DecryptorPort;

use super::key_ring::KeyRing;

/// AES-256-GCM with a 128-bit nonce, as used by older clients.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Transport encoding of fetched ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CiphertextEncoding {
    /// Bytes are the ciphertext.
    Raw,
    /// Bytes are base64 text of the ciphertext.
    #[default]
    Base64,
}

/// Decrypts attachments with keys looked up in a [`KeyRing`].
///
/// IVs are base64 and may be 12 or 16 bytes long.
#[derive(Debug, Clone)]
pub struct AesGcmDecryptor {
    keys: Arc<KeyRing>,
    encoding: CiphertextEncoding,
}

impl AesGcmDecryptor {
    /// Creates a decryptor over `keys`.
    #[must_use]
    pub const fn new(keys: Arc<KeyRing>, encoding: CiphertextEncoding) -> Self {
        Self { keys, encoding }
    }

    fn unwrap_payload<'a>(&self, ciphertext: &'a [u8]) -> Result<Cow<'a, [u8]>, DecryptError> {
        match self.encoding {
            CiphertextEncoding::Raw => Ok(Cow::Borrowed(ciphertext)),
            CiphertextEncoding::Base64 => BASE64
                .decode(ciphertext.trim_ascii())
                .map(Cow::Owned)
                .map_err(|e| DecryptError::MalformedCiphertext(e.to_string())),
        }
    }
}

impl DecryptorPort for AesGcmDecryptor {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &KeyId,
        iv: &Iv,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| DecryptError::UnknownKey(key_id.to_string()))?;
        let nonce = BASE64
            .decode(iv.as_str())
            .map_err(|e| DecryptError::InvalidIv(e.to_string()))?;
        let payload = self.unwrap_payload(ciphertext)?;

        let plaintext = match nonce.len() {
            12 => Aes256Gcm::new_from_slice(key.as_slice())
                .map_err(|e| DecryptError::InvalidKey(e.to_string()))?
                .decrypt(GenericArray::from_slice(&nonce), payload.as_ref()),
            16 => Aes256Gcm16::new_from_slice(key.as_slice())
                .map_err(|e| DecryptError::InvalidKey(e.to_string()))?
                .decrypt(GenericArray::from_slice(&nonce), payload.as_ref()),
            n => {
                return Err(DecryptError::InvalidIv(format!(
                    "expected 12 or 16 bytes, got {n}"
                )));
            }
        };

        plaintext
            .map(Zeroizing::new)
            .map_err(|_| DecryptError::AuthenticationFailed)
    }
}
