//! Spotview - encrypted chat attachment viewer core.
//!
//! Fetches encrypted image attachments, decrypts and downsamples them off the
//! caller's thread, and binds the result to views that may be recycled while
//! work is in flight. Decoded bitmaps live in a byte-bounded memory cache that
//! can be purged at once on logout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the attachment pipeline.
pub mod application;
/// Domain layer containing entities, errors, binding state and ports.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing attachment consumers.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "spotview";
