pub mod attachment_pipeline;
pub mod delivery;

pub use attachment_pipeline::{
    AttachmentPipeline, DEFAULT_DISPLAY_HEIGHT, DEFAULT_FADE_IN_MS, PipelineConfig,
    RequestDisposition,
};
pub use delivery::{DeliveryOutcome, DeliveryQueue, DeliveryReport};
