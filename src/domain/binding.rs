//! Per-consumer binding state and in-flight request bookkeeping.
//!
//! A consumer owns exactly one [`BindingSlot`]. While a fetch is outstanding
//! the slot holds a [`BindingToken`] with a weak reference to the
//! [`InFlightRequest`] doing the work. Deliveries compare request identity
//! against the token before touching the consumer, so only the most recent
//! request can ever bind its result.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::domain::entities::{CipherFingerprint, MessageAttachmentRef};

const ACTIVE: u8 = 0;
const SUPERSEDED: u8 = 1;
const CANCELLED: u8 = 2;

/// Unique, monotonically assigned request identifier.
pub type RequestId = u64;

/// One fetch-decrypt-materialize job.
///
/// Created on a cache miss and discarded after its single terminal outcome.
pub struct InFlightRequest {
    id: RequestId,
    attachment: Arc<MessageAttachmentRef>,
    generation: u64,
    state: AtomicU8,
}

impl InFlightRequest {
    /// Creates an active request bound to the cache generation it started in.
    #[must_use]
    pub const fn new(
        id: RequestId,
        attachment: Arc<MessageAttachmentRef>,
        generation: u64,
    ) -> Self {
        Self {
            id,
            attachment,
            generation,
            state: AtomicU8::new(ACTIVE),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the attachment this request was created for.
    #[must_use]
    pub const fn attachment(&self) -> &Arc<MessageAttachmentRef> {
        &self.attachment
    }

    /// Returns the cache generation observed when the request started.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Marks the request as replaced by a newer one on the same consumer.
    ///
    /// A superseded request never binds, but may still populate the cache.
    pub fn supersede(&self) {
        let _ = self
            .state
            .compare_exchange(ACTIVE, SUPERSEDED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Hard-cancels the request. It must neither bind nor cache.
    pub fn cancel(&self) {
        self.state.store(CANCELLED, Ordering::Release);
    }

    /// Returns true once superseded or cancelled.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.state.load(Ordering::Acquire) != ACTIVE
    }

    /// Returns true if hard-cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Returns true if this request already targets `attachment`.
    #[must_use]
    pub fn targets(&self, attachment: &Arc<MessageAttachmentRef>) -> bool {
        Arc::ptr_eq(&self.attachment, attachment) || *self.attachment == **attachment
    }
}

impl fmt::Debug for InFlightRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRequest")
            .field("id", &self.id)
            .field("fingerprint", self.attachment.fingerprint())
            .field("generation", &self.generation)
            .field("superseded", &self.is_superseded())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Placeholder attached to a consumer while its request is outstanding.
#[derive(Debug, Clone)]
pub struct BindingToken {
    request: Weak<InFlightRequest>,
    placeholder_height: u32,
}

impl BindingToken {
    /// Creates a token referencing `request` without owning it.
    #[must_use]
    pub fn new(request: &Arc<InFlightRequest>, placeholder_height: u32) -> Self {
        Self {
            request: Arc::downgrade(request),
            placeholder_height,
        }
    }

    /// Returns the request if it is still alive.
    #[must_use]
    pub fn request(&self) -> Option<Arc<InFlightRequest>> {
        self.request.upgrade()
    }

    /// Returns true if this token was issued for exactly `request`.
    #[must_use]
    pub fn is_for(&self, request: &Arc<InFlightRequest>) -> bool {
        std::ptr::eq(self.request.as_ptr(), Arc::as_ptr(request))
    }

    /// Height the consumer reserves while waiting.
    #[must_use]
    pub const fn placeholder_height(&self) -> u32 {
        self.placeholder_height
    }
}

/// Binding state machine of a single consumer.
#[derive(Debug, Clone, Default)]
pub enum BindingState {
    /// Nothing requested, or the last request failed.
    #[default]
    Idle,
    /// A request is outstanding.
    Pending(BindingToken),
    /// A bitmap is displayed.
    Bound(CipherFingerprint),
}

/// Coarse view of [`BindingState`] for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    /// No binding.
    Idle,
    /// Waiting on a request.
    Pending,
    /// Displaying a bitmap.
    Bound,
}

/// Holder of a consumer's binding state.
#[derive(Debug, Default)]
pub struct BindingSlot {
    state: Mutex<BindingState>,
}

impl BindingSlot {
    /// Creates an idle slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> BindingPhase {
        match *self.state.lock() {
            BindingState::Idle => BindingPhase::Idle,
            BindingState::Pending(_) => BindingPhase::Pending,
            BindingState::Bound(_) => BindingPhase::Bound,
        }
    }

    /// Returns the fingerprint of the displayed bitmap, if bound.
    #[must_use]
    pub fn bound_fingerprint(&self) -> Option<CipherFingerprint> {
        match &*self.state.lock() {
            BindingState::Bound(fp) => Some(fp.clone()),
            _ => None,
        }
    }

    /// Returns the live request behind the pending token, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<Arc<InFlightRequest>> {
        match &*self.state.lock() {
            BindingState::Pending(token) => token.request(),
            _ => None,
        }
    }

    /// Returns true if the pending token identifies `request`.
    #[must_use]
    pub fn is_pending_for(&self, request: &Arc<InFlightRequest>) -> bool {
        matches!(&*self.state.lock(), BindingState::Pending(token) if token.is_for(request))
    }

    /// Replaces the state with a fresh pending token.
    ///
    /// Returns the previously pending request so the caller can supersede it.
    pub fn install(&self, token: BindingToken) -> Option<Arc<InFlightRequest>> {
        let previous = std::mem::replace(&mut *self.state.lock(), BindingState::Pending(token));
        match previous {
            BindingState::Pending(old) => old.request(),
            _ => None,
        }
    }

    /// Binds a bitmap immediately, dropping any pending token.
    ///
    /// Returns the previously pending request, if any.
    pub fn bind_now(&self, fingerprint: CipherFingerprint) -> Option<Arc<InFlightRequest>> {
        self.bind_now_with(fingerprint, || ())
    }

    /// Like [`Self::bind_now`], running `apply` before the slot is unlocked.
    ///
    /// `apply` must not call back into this slot.
    pub fn bind_now_with(
        &self,
        fingerprint: CipherFingerprint,
        apply: impl FnOnce(),
    ) -> Option<Arc<InFlightRequest>> {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut *state, BindingState::Bound(fingerprint));
        apply();
        match previous {
            BindingState::Pending(old) => old.request(),
            _ => None,
        }
    }

    /// Applies a terminal outcome if `request` still owns the slot.
    ///
    /// `Some(fingerprint)` moves to `Bound`, `None` returns to `Idle`.
    /// Returns false and leaves the state untouched when stale.
    pub fn complete(
        &self,
        request: &Arc<InFlightRequest>,
        bound: Option<CipherFingerprint>,
    ) -> bool {
        self.complete_with(request, bound, || ()).is_some()
    }

    /// Like [`Self::complete`], running `apply` before the slot is unlocked.
    ///
    /// Nothing can rebind the slot between the ownership check and `apply`.
    /// Returns None without calling `apply` when stale. `apply` must not
    /// call back into this slot.
    pub fn complete_with<R>(
        &self,
        request: &Arc<InFlightRequest>,
        bound: Option<CipherFingerprint>,
        apply: impl FnOnce() -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if !matches!(&*state, BindingState::Pending(token) if token.is_for(request)) {
            return None;
        }
        *state = bound.map_or(BindingState::Idle, BindingState::Bound);
        Some(apply())
    }

    /// Drops any binding and returns the pending request, if any.
    pub fn reset(&self) -> Option<Arc<InFlightRequest>> {
        let previous = std::mem::take(&mut *self.state.lock());
        match previous {
            BindingState::Pending(old) => old.request(),
            _ => None,
        }
    }
}
