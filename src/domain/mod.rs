//! Domain layer with core entities, binding state and port definitions.

/// Per-consumer binding state.
pub mod binding;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use binding::{
    BindingPhase, BindingSlot, BindingState, BindingToken, InFlightRequest, RequestId,
};
pub use entities::{CipherFingerprint, ContentLocator, Iv, KeyId, MessageAttachmentRef, MessageId};
pub use errors::PipelineError;
pub use ports::{
    ContentFetcherPort, DecryptorPort, ImageCachePort, ImageConsumer, ImageMaterializerPort,
};
