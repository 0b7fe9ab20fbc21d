//! Port definition for symmetric attachment decryption.

use zeroize::Zeroizing;

use crate::domain::entities::{Iv, KeyId};
use crate::domain::errors::DecryptError;

/// Turns attachment ciphertext into plaintext.
///
/// Called from a blocking worker thread.
#[cfg_attr(test, mockall::automock)]
pub trait DecryptorPort: Send + Sync {
    /// Decrypts `ciphertext` with the key named by `key_id` and the given IV.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &KeyId,
        iv: &Iv,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError>;
}
