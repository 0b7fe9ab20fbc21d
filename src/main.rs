use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail, eyre};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use spotview::application::{AttachmentPipeline, DeliveryOutcome, RequestDisposition};
use spotview::domain::{ContentLocator, Iv, KeyId, MessageAttachmentRef, MessageId};
use spotview::infrastructure::{
    AesGcmDecryptor, AppConfig, CliArgs, HttpContentFetcher, KeyRing, MemoryImageCache,
    SampledImageMaterializer, StorageManager,
};
use spotview::presentation::FileSinkConsumer;

fn init_logging(config: &AppConfig) -> Result<()> {
    let default_level = LevelFilter::from_level(config.log_level.to_tracing_level());
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = spotview::VERSION, "Starting {}", spotview::NAME);

    let key_id = KeyId::new(args.key_id.as_str());
    let keys = Arc::new(KeyRing::new());
    let hex_key = args
        .key
        .as_deref()
        .ok_or_else(|| eyre!("no key given, pass --key or set SPOTVIEW_KEY"))?;
    keys.insert_hex(key_id.clone(), hex_key)?;

    let mut fetcher = HttpContentFetcher::new(config.transport.fetch_timeout_secs)?;
    if let Some(base_url) = &config.transport.base_url {
        fetcher = fetcher.with_base_url(base_url.as_str());
    }
    let cache = Arc::new(MemoryImageCache::new(config.pipeline.memory_cache_bytes));

    let (pipeline, mut deliveries) = AttachmentPipeline::new(
        cache.clone(),
        Arc::new(fetcher),
        Arc::new(AesGcmDecryptor::new(
            keys.clone(),
            config.transport.ciphertext_encoding,
        )),
        Arc::new(SampledImageMaterializer::new()),
        config.pipeline.clone(),
    );

    let mut attachment = MessageAttachmentRef::new(
        MessageId::new(args.message_id.as_str()),
        ContentLocator::new(args.locator.as_str()),
        key_id,
        Iv::new(args.iv.as_str()),
    );
    if let Some(height) = args.known_height {
        attachment = attachment.with_known_height(height);
    }
    let attachment = Arc::new(attachment);
    let sink = FileSinkConsumer::new(args.output.clone());

    if let RequestDisposition::Started(id) = pipeline.request(&sink, &attachment) {
        while let Some(report) = deliveries.next().await {
            if report.request_id != id {
                continue;
            }
            match report.outcome {
                DeliveryOutcome::Bound => break,
                DeliveryOutcome::Failed(e) => bail!(e),
                other => bail!("attachment was not delivered: {other:?}"),
            }
        }
    }

    let path = sink.save()?;
    println!("{}", path.display());
    info!(
        height = attachment.known_height(),
        stats = %cache.stats(),
        "Attachment rendered"
    );

    pipeline.evict_all();
    keys.clear();

    Ok(())
}
