//! Attachment decryption adapters.

pub mod aes_gcm_decryptor;
pub mod key_ring;

pub use aes_gcm_decryptor::{AesGcmDecryptor, CiphertextEncoding};
pub use key_ring::{KEY_LEN, KeyRing, SymmetricKey};
