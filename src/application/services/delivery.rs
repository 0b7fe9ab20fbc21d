//! Serialized application of worker outcomes to consumers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::binding::{InFlightRequest, RequestId};
use crate::domain::entities::CipherFingerprint;
use crate::domain::errors::PipelineError;
use crate::domain::ports::{ImageCachePort, ImageConsumer};

/// Terminal outcome of one worker, in transit to the delivery context.
pub(crate) struct Delivery {
    pub(crate) request: Arc<InFlightRequest>,
    pub(crate) consumer: Weak<dyn ImageConsumer>,
    pub(crate) outcome: Result<Arc<image::DynamicImage>, PipelineError>,
}

/// What a delivery did to its consumer.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    /// The bitmap was bound.
    Bound,
    /// The consumer had moved on to another request; nothing changed.
    Stale,
    /// The consumer no longer exists.
    ConsumerGone,
    /// The request was cancelled; the consumer keeps its placeholder.
    Cancelled,
    /// Fetch, decrypt or decode failed; the consumer keeps its placeholder.
    Failed(PipelineError),
}

/// Report of one applied delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// The request that produced the outcome.
    pub request_id: RequestId,
    /// Fingerprint of the requested attachment.
    pub fingerprint: CipherFingerprint,
    /// Whether the bitmap was inserted into the cache.
    pub cached: bool,
    /// Effect on the consumer.
    pub outcome: DeliveryOutcome,
}

impl DeliveryReport {
    /// Returns true if the bitmap reached the consumer.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Bound)
    }
}

/// The delivery context.
///
/// Owned by whoever drives the UI. Outcomes are applied one at a time, each
/// while holding the consumer's binding slot, so a concurrent `request` on
/// the same consumer lands either wholly before or wholly after it.
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Delivery>,
    cache: Arc<dyn ImageCachePort>,
    transition: Option<Duration>,
}

impl DeliveryQueue {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Delivery>,
        cache: Arc<dyn ImageCachePort>,
        transition: Option<Duration>,
    ) -> Self {
        Self {
            rx,
            cache,
            transition,
        }
    }

    /// Waits for the next outcome and applies it.
    ///
    /// Returns None once the pipeline and all workers are gone.
    pub async fn next(&mut self) -> Option<DeliveryReport> {
        let delivery = self.rx.recv().await?;
        Some(self.apply(delivery))
    }

    /// Applies every outcome already queued without waiting.
    pub fn apply_pending(&mut self) -> Vec<DeliveryReport> {
        let mut reports = Vec::new();
        while let Ok(delivery) = self.rx.try_recv() {
            reports.push(self.apply(delivery));
        }
        reports
    }

    /// Applies outcomes until the pipeline is dropped.
    pub async fn run(mut self) {
        while self.next().await.is_some() {}
        debug!("Delivery queue closed");
    }

    fn apply(&self, delivery: Delivery) -> DeliveryReport {
        let Delivery {
            request,
            consumer,
            outcome,
        } = delivery;
        let fingerprint = request.attachment().fingerprint().clone();

        let purged = request.is_cancelled() || request.generation() != self.cache.generation();
        let outcome = if purged {
            Err(PipelineError::Cancelled)
        } else {
            outcome
        };

        let cached = match &outcome {
            Ok(image) => {
                self.cache
                    .put_if_current(fingerprint.clone(), image.clone(), request.generation())
            }
            Err(_) => false,
        };

        let report = |effect| DeliveryReport {
            request_id: request.id(),
            fingerprint: fingerprint.clone(),
            cached,
            outcome: effect,
        };

        let Some(consumer) = consumer.upgrade() else {
            trace!(request = request.id(), "Consumer dropped before delivery");
            return report(DeliveryOutcome::ConsumerGone);
        };

        match outcome {
            Ok(image) => {
                let (width, height) = (image.width(), image.height());
                let target = Some(fingerprint.clone());
                let bound = consumer.binding().complete_with(&request, target, || {
                    consumer.clear_transient_state();
                    if let Some(duration) = self.transition {
                        consumer.play_entry_transition(duration);
                    }
                    consumer.set_image(image);
                    request.attachment().record_height(height)
                });

                match bound {
                    None => {
                        debug!(
                            request = request.id(),
                            fingerprint = %fingerprint,
                            "Discarding stale image"
                        );
                        report(DeliveryOutcome::Stale)
                    }
                    Some(recorded) => {
                        if recorded {
                            debug!(
                                message = %request.attachment().message_id(),
                                width,
                                height,
                                "Recorded attachment height from image"
                            );
                        }
                        debug!(request = request.id(), fingerprint = %fingerprint, "Image bound");
                        report(DeliveryOutcome::Bound)
                    }
                }
            }
            Err(error) => {
                if !consumer.binding().complete(&request, None) {
                    return report(DeliveryOutcome::Stale);
                }
                if error.is_cancelled() {
                    report(DeliveryOutcome::Cancelled)
                } else {
                    report(DeliveryOutcome::Failed(error))
                }
            }
        }
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}
