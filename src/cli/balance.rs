//! `refresh`, `refresh-all` and `daemon` commands.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{DaemonArgs, RefreshArgs};
use crate::cli::output::{CommandOutput, render_json};
use crate::core::balance::BalanceService;
use crate::core::health::StoreChannelHealth;
use crate::core::http::build_client;
use crate::core::store::ChannelStore;
use crate::error::{RelayError, Result};
use crate::providers::{ProbeContext, ProbeRegistry};
use crate::storage::channels::FileChannelStore;
use crate::storage::config::Config;

/// Wire the file store, default probes and store-backed health handler.
///
/// # Errors
///
/// Fails if the channels file cannot be loaded or the HTTP client cannot be built.
pub fn build_service(config: &Config, channels: Option<&Path>) -> Result<BalanceService> {
    let path = channels.map_or_else(|| config.channels_file(), Path::to_path_buf);
    let store: Arc<dyn ChannelStore> = Arc::new(FileChannelStore::load(&path)?);
    let health = Arc::new(StoreChannelHealth::new(store.clone()));
    let ctx = ProbeContext::new(build_client(config.timeout())?, config.exchange_rate()?);

    Ok(BalanceService::new(
        store,
        health,
        ProbeRegistry::with_defaults(),
        ctx,
        config.sweep_settings(),
    ))
}

/// Execute `refresh <ID>`.
pub async fn refresh(
    args: &RefreshArgs,
    config: &Config,
    channels: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let service = build_service(config, channels)?;
    let balance = service.refresh(args.id).await?;
    println!(
        "{}",
        render_json(&CommandOutput::ok("").with_balance(balance), pretty)?
    );
    Ok(())
}

/// Execute `refresh-all`.
pub async fn refresh_all(config: &Config, channels: Option<&Path>, pretty: bool) -> Result<()> {
    let service = build_service(config, channels)?;
    let report = service.sweep_all().await?;
    tracing::info!(
        probed = report.probed,
        updated = report.updated,
        disabled = report.disabled,
        failed = report.failures.len(),
        "Sweep finished"
    );
    println!(
        "{}",
        render_json(&CommandOutput::ok("").with_report(report), pretty)?
    );
    Ok(())
}

/// Execute `daemon`: sweep periodically until Ctrl-C.
pub async fn daemon(
    args: &DaemonArgs,
    config: &Config,
    channels: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let frequency = match args.frequency {
        Some(0) => None,
        Some(minutes) => Some(std::time::Duration::from_secs(minutes * 60)),
        None => config.sweep_frequency(),
    }
    .ok_or_else(|| {
        RelayError::Config("sweep frequency must be at least one minute".to_string())
    })?;

    let service = Arc::new(build_service(config, channels)?);
    let shutdown = CancellationToken::new();

    tracing::info!(frequency_secs = frequency.as_secs(), "Balance sweep scheduled");
    let scheduler = tokio::spawn(service.run_periodic(frequency, shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();
    scheduler
        .await
        .map_err(|e| RelayError::Other(anyhow::anyhow!("sweep scheduler panicked: {e}")))?;

    println!("{}", render_json(&CommandOutput::ok("stopped"), pretty)?);
    Ok(())
}
