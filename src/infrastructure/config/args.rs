//! Command-line arguments.

use super::app_config::LogLevel;
use crate::infrastructure::crypto::CiphertextEncoding;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "spotview",
    version,
    about = "Fetch, decrypt and render an encrypted chat image attachment",
    long_about = None
)]
pub struct CliArgs {
    /// Attachment locator (absolute URL, or path relative to the base URL).
    #[arg(value_name = "LOCATOR")]
    pub locator: String,

    /// Identifier of the key the attachment was sealed with.
    #[arg(long)]
    pub key_id: String,

    /// Hex-encoded AES-256 key.
    #[arg(long, env = "SPOTVIEW_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Base64 IV the attachment was sealed with.
    #[arg(long)]
    pub iv: String,

    /// Identifier of the message that carries the attachment.
    #[arg(long, default_value = "cli")]
    pub message_id: String,

    /// Known display height of the attachment, if any.
    #[arg(long)]
    pub known_height: Option<u32>,

    /// Where to write the rendered image.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Target display height in pixels.
    #[arg(long)]
    pub display_height: Option<u32>,

    /// Memory cache budget in bytes.
    #[arg(long)]
    pub memory_cache_bytes: Option<usize>,

    /// Maximum concurrent workers.
    #[arg(long)]
    pub max_concurrent_workers: Option<usize>,

    /// Play the entry transition on bind.
    #[arg(long)]
    pub enable_animations: Option<bool>,

    /// Base URL for relative locators.
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Wire encoding of the ciphertext.
    #[arg(long, value_enum)]
    pub ciphertext_encoding: Option<CiphertextEncoding>,
}
