mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use look_later_coordinator::{run_session, CoordinatorSettings};
use look_later_storage::{InMemorySubstrate, KvLinkStore, RedisSubstrate, Substrate, TimeoutLinkStore};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        store_timeout_ms = config.store_timeout_ms,
        quota_bytes = config.quota_bytes,
        "starting look later host"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    let store_timeout = Duration::from_millis(config.store_timeout_ms);
    let settings = CoordinatorSettings::builder()
        .request_timeout(request_deadline(
            Duration::from_millis(config.request_timeout_ms),
            store_timeout,
        ))
        .build();

    match config.storage {
        StorageBackendArg::InMemory => {
            let substrate = InMemorySubstrate::with_quota(config.quota_bytes);
            run(substrate, store_timeout, settings, cancel).await
        }
        StorageBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .context("redis url is required when storage backend is redis")?;
            let substrate = RedisSubstrate::connect(&redis_url)
                .await?
                .with_quota(config.quota_bytes);
            run(substrate, store_timeout, settings, cancel).await
        }
    }
}

/// A remove may queue behind one store call and then run its own, so its
/// deadline must outlast two of them.
fn request_deadline(requested: Duration, store_timeout: Duration) -> Duration {
    let floor = store_timeout * 2 + Duration::from_secs(1);
    if requested < floor {
        warn!(
            requested_ms = requested.as_millis() as u64,
            floor_ms = floor.as_millis() as u64,
            "request timeout too short for the store timeout, raising it"
        );
        return floor;
    }
    requested
}

/// Logs go to stderr; stdout carries the native-messaging stream.
fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn run<S: Substrate>(
    substrate: S,
    store_timeout: Duration,
    settings: CoordinatorSettings,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let store = TimeoutLinkStore::new(KvLinkStore::new(substrate), store_timeout);
    run_session(store, settings, tokio::io::stdin(), tokio::io::stdout(), cancel).await?;
    info!("look later host stopped");
    Ok(())
}
