//! Domain entity definitions.

mod attachment;

pub use attachment::{
    CipherFingerprint, ContentLocator, Iv, KeyId, MessageAttachmentRef, MessageId,
};
