//! Fetch-decrypt-display orchestration.
//!
//! `request` checks the memory cache, binds hits synchronously, and on a miss
//! spawns one worker per consumer binding. Workers hand their outcome to the
//! [`DeliveryQueue`], which applies it only if the consumer still points at
//! that exact request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, trace, warn};

use crate::domain::binding::{BindingToken, InFlightRequest, RequestId};
use crate::domain::entities::MessageAttachmentRef;
use crate::domain::errors::{DecodeError, PipelineError};
use crate::domain::ports::{
    ContentFetcherPort, DecryptorPort, ImageCachePort, ImageConsumer, ImageMaterializerPort,
};

use super::delivery::{Delivery, DeliveryQueue};

/// Default display height for materialized attachments.
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 200;

/// Default entry transition length in milliseconds.
pub const DEFAULT_FADE_IN_MS: u64 = 1000;

/// Configuration for the attachment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Byte budget of the decoded-image memory cache.
    #[serde(default = "default_memory_cache_bytes")]
    pub memory_cache_bytes: usize,

    /// Target height for materialization, and placeholder height for
    /// attachments without a known height.
    #[serde(default = "default_display_height")]
    pub display_height: u32,

    /// Maximum workers fetching or decoding at once.
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,

    /// Play the entry transition when a fetched image is bound.
    #[serde(default = "default_true")]
    pub enable_animations: bool,

    /// Entry transition length in milliseconds.
    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,

    /// Let superseded workers finish so their result lands in the cache.
    /// When false, supersession aborts the worker at its next checkpoint.
    #[serde(default = "default_true")]
    pub finish_superseded: bool,
}

fn default_memory_cache_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_display_height() -> u32 {
    DEFAULT_DISPLAY_HEIGHT
}

fn default_max_concurrent_workers() -> usize {
    4
}

fn default_fade_in_ms() -> u64 {
    DEFAULT_FADE_IN_MS
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            memory_cache_bytes: default_memory_cache_bytes(),
            display_height: DEFAULT_DISPLAY_HEIGHT,
            max_concurrent_workers: default_max_concurrent_workers(),
            enable_animations: true,
            fade_in_ms: DEFAULT_FADE_IN_MS,
            finish_superseded: true,
        }
    }
}

impl PipelineConfig {
    /// Returns the entry transition, or None when animations are disabled.
    #[must_use]
    pub fn entry_transition(&self) -> Option<Duration> {
        self.enable_animations
            .then(|| Duration::from_millis(self.fade_in_ms))
    }
}

/// What `request` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// Bound synchronously from the cache.
    CacheHit,
    /// The consumer already waits on a request for the same attachment.
    AlreadyPending(RequestId),
    /// A new worker was started.
    Started(RequestId),
}

type InFlightMap = Arc<Mutex<HashMap<RequestId, Weak<InFlightRequest>>>>;

/// Orchestrates cache lookup, background workers and consumer binding.
pub struct AttachmentPipeline {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ContentFetcherPort>,
    decryptor: Arc<dyn DecryptorPort>,
    materializer: Arc<dyn ImageMaterializerPort>,
    config: PipelineConfig,
    semaphore: Arc<Semaphore>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    in_flight: InFlightMap,
    next_id: AtomicU64,
    workers_started: AtomicU64,
}

impl std::fmt::Debug for AttachmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AttachmentPipeline {
    /// Creates a pipeline and the delivery queue its workers report to.
    ///
    /// The queue must be drained on the context that owns the consumers.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ImageCachePort>,
        fetcher: Arc<dyn ContentFetcherPort>,
        decryptor: Arc<dyn DecryptorPort>,
        materializer: Arc<dyn ImageMaterializerPort>,
        config: PipelineConfig,
    ) -> (Self, DeliveryQueue) {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let deliveries = DeliveryQueue::new(delivery_rx, cache.clone(), config.entry_transition());
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_workers.max(1)));

        let pipeline = Self {
            cache,
            fetcher,
            decryptor,
            materializer,
            config,
            semaphore,
            delivery_tx,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            workers_started: AtomicU64::new(0),
        };
        (pipeline, deliveries)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns how many workers have been started.
    #[must_use]
    pub fn workers_started(&self) -> u64 {
        self.workers_started.load(Ordering::Relaxed)
    }

    /// Returns how many workers are still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Binds `attachment` to `consumer`.
    ///
    /// Cache hits bind before returning. Misses install a placeholder and
    /// start a worker unless one for the same attachment is already pending
    /// on this consumer. Must be called from within a Tokio runtime.
    pub fn request<C>(
        &self,
        consumer: &Arc<C>,
        attachment: &Arc<MessageAttachmentRef>,
    ) -> RequestDisposition
    where
        C: ImageConsumer + 'static,
    {
        let fingerprint = attachment.fingerprint();

        if let Some(image) = self.cache.get(fingerprint) {
            let previous = consumer.binding().bind_now_with(fingerprint.clone(), || {
                consumer.clear_transient_state();
                consumer.set_image(image);
            });
            if let Some(previous) = previous
                && !previous.targets(attachment)
            {
                previous.supersede();
                debug!(superseded = previous.id(), "Cache hit superseded pending request");
            }
            trace!(fingerprint = %fingerprint, "Bound attachment from memory cache");
            return RequestDisposition::CacheHit;
        }

        if let Some(pending) = consumer.binding().pending_request()
            && pending.targets(attachment)
            && !pending.is_cancelled()
        {
            trace!(
                request = pending.id(),
                fingerprint = %fingerprint,
                "Attachment already loading"
            );
            return RequestDisposition::AlreadyPending(pending.id());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Arc::new(InFlightRequest::new(
            id,
            attachment.clone(),
            self.cache.generation(),
        ));
        let placeholder_height = match attachment.known_height() {
            0 => self.config.display_height,
            known => known,
        };

        if let Some(previous) = consumer
            .binding()
            .install(BindingToken::new(&request, placeholder_height))
        {
            previous.supersede();
            debug!(superseded = previous.id(), request = id, "Superseded pending request");
        }
        consumer.show_placeholder(placeholder_height);

        self.in_flight.lock().insert(id, Arc::downgrade(&request));
        self.workers_started.fetch_add(1, Ordering::Relaxed);

        let consumer: Arc<dyn ImageConsumer> = consumer.clone();
        let consumer = Arc::downgrade(&consumer);
        let worker = Worker {
            fetcher: self.fetcher.clone(),
            decryptor: self.decryptor.clone(),
            materializer: self.materializer.clone(),
            semaphore: self.semaphore.clone(),
            delivery_tx: self.delivery_tx.clone(),
            in_flight: self.in_flight.clone(),
            target_height: self.config.display_height,
            finish_superseded: self.config.finish_superseded,
        };

        debug!(request = id, fingerprint = %fingerprint, "Starting attachment worker");
        tokio::spawn(worker.run(request, consumer));
        RequestDisposition::Started(id)
    }

    /// Detaches `consumer` from whatever it was showing or waiting for.
    pub fn release<C>(&self, consumer: &C)
    where
        C: ImageConsumer + ?Sized,
    {
        if let Some(previous) = consumer.binding().reset() {
            previous.supersede();
            debug!(request = previous.id(), "Released consumer binding");
        }
        consumer.clear_transient_state();
    }

    /// Purges every decrypted image from memory.
    ///
    /// Running workers are cancelled and can neither bind nor repopulate
    /// the cache afterwards. Call on logout, lock or memory pressure.
    pub fn evict_all(&self) {
        let cancelled: Vec<_> = self
            .in_flight
            .lock()
            .drain()
            .filter_map(|(_, request)| request.upgrade())
            .collect();
        for request in &cancelled {
            request.cancel();
        }
        self.cache.clear();
        info!(cancelled = cancelled.len(), "Evicted all decrypted images");
    }
}

fn aborted(request: &InFlightRequest, finish_superseded: bool) -> bool {
    request.is_cancelled() || (!finish_superseded && request.is_superseded())
}

/// Removes a worker's `in_flight` entry however the worker ends.
struct Registration {
    in_flight: InFlightMap,
    id: RequestId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.id);
    }
}

/// Background half of one request.
struct Worker {
    fetcher: Arc<dyn ContentFetcherPort>,
    decryptor: Arc<dyn DecryptorPort>,
    materializer: Arc<dyn ImageMaterializerPort>,
    semaphore: Arc<Semaphore>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    in_flight: InFlightMap,
    target_height: u32,
    finish_superseded: bool,
}

impl Worker {
    async fn run(self, request: Arc<InFlightRequest>, consumer: Weak<dyn ImageConsumer>) {
        let registration = Registration {
            in_flight: self.in_flight.clone(),
            id: request.id(),
        };
        let outcome = self.produce(&request).await;

        match &outcome {
            Ok(image) => trace!(
                request = request.id(),
                width = image.width(),
                height = image.height(),
                "Attachment materialized"
            ),
            Err(PipelineError::Cancelled) => {
                debug!(request = request.id(), "Attachment worker cancelled");
            }
            Err(e) => warn!(
                request = request.id(),
                fingerprint = %request.attachment().fingerprint(),
                error = %e,
                "Attachment could not be loaded"
            ),
        }

        drop(registration);
        let delivery = Delivery {
            request,
            consumer,
            outcome,
        };
        if self.delivery_tx.send(delivery).is_err() {
            debug!("Delivery queue closed, dropping outcome");
        }
    }

    async fn produce(
        &self,
        request: &Arc<InFlightRequest>,
    ) -> Result<Arc<image::DynamicImage>, PipelineError> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Cancelled)?;

        if aborted(request, self.finish_superseded) {
            return Err(PipelineError::Cancelled);
        }

        let attachment = request.attachment().clone();
        let ciphertext = self.fetcher.fetch(attachment.locator()).await?;

        if aborted(request, self.finish_superseded) {
            return Err(PipelineError::Cancelled);
        }

        let decryptor = self.decryptor.clone();
        let materializer = self.materializer.clone();
        let target_height = self.target_height;
        let finish_superseded = self.finish_superseded;
        let checkpoint = request.clone();

        let decoded = tokio::task::spawn_blocking(move || {
            let plaintext = decryptor.decrypt(&ciphertext, attachment.key_id(), attachment.iv())?;
            if aborted(&checkpoint, finish_superseded) {
                return Err(PipelineError::Cancelled);
            }
            Ok(materializer.decode(&plaintext, target_height)?)
        })
        .await
        .map_err(|e| DecodeError::TaskFailed(e.to_string()))??;

        Ok(Arc::new(decoded))
    }
}
