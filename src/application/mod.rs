//! Application layer with the attachment pipeline.

/// Pipeline orchestration and delivery.
pub mod services;

pub use services::{
    AttachmentPipeline, DeliveryOutcome, DeliveryQueue, DeliveryReport, PipelineConfig,
    RequestDisposition,
};
