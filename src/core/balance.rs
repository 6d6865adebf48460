//! Channel balance refresh.
//!
//! - [`BalanceService::refresh`]: one channel, on demand, errors surfaced verbatim.
//! - [`BalanceService::sweep_all`]: every eligible channel, strictly sequential,
//!   paced, auto-disabling depleted channels; per-channel errors are logged
//!   and never stop the sweep.
//! - [`BalanceService::run_periodic`]: the sweep on a fixed period.
//!
//! A sweep's read-then-disable is not transactional; a manual refresh that
//! raises the balance concurrently can still lose to a disable decision.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::health::{ChannelFault, ChannelHealth, REASON_INSUFFICIENT_BALANCE};
use super::models::Channel;
use super::store::ChannelStore;
use crate::error::{RelayError, Result};
use crate::providers::{ProbeContext, ProbeRegistry};

// =============================================================================
// Balance Updater
// =============================================================================

/// Writes a normalized balance onto the channel record.
pub struct BalanceUpdater {
    store: Arc<dyn ChannelStore>,
    clock: Arc<dyn Clock>,
}

impl BalanceUpdater {
    #[must_use]
    pub fn new(store: Arc<dyn ChannelStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist `balance` for `channel` and hand it back.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn apply(&self, channel: &Channel, balance: f64) -> Result<f64> {
        self.store
            .update_balance(channel.id, balance, self.clock.now())
            .await?;
        Ok(balance)
    }
}

// =============================================================================
// Sweep Report
// =============================================================================

/// One channel the sweep could not refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub channel_id: i64,
    pub error: String,
}

/// Outcome of one fleet sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub probed: usize,
    pub skipped: usize,
    pub updated: usize,
    pub disabled: usize,
    pub failures: Vec<SweepFailure>,
}

// =============================================================================
// Balance Service
// =============================================================================

/// Pacing for the sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSettings {
    /// Pause between two probed channels.
    pub request_interval: Duration,
}

/// Probe registry, store, health collaborator and clock wired together.
pub struct BalanceService {
    store: Arc<dyn ChannelStore>,
    health: Arc<dyn ChannelHealth>,
    registry: ProbeRegistry,
    ctx: ProbeContext,
    updater: BalanceUpdater,
    settings: SweepSettings,
}

impl BalanceService {
    #[must_use]
    pub fn new(
        store: Arc<dyn ChannelStore>,
        health: Arc<dyn ChannelHealth>,
        registry: ProbeRegistry,
        ctx: ProbeContext,
        settings: SweepSettings,
    ) -> Self {
        let updater = BalanceUpdater::new(store.clone(), ctx.clock.clone());
        Self {
            store,
            health,
            registry,
            ctx,
            updater,
            settings,
        }
    }

    /// Probe one channel record and persist the result.
    ///
    /// A failed probe leaves the stored balance untouched.
    ///
    /// # Errors
    ///
    /// Any probe or store error.
    pub async fn refresh_channel(&self, channel: &Channel) -> Result<f64> {
        let balance = self.registry.probe(&self.ctx, channel).await?;
        self.updater.apply(channel, balance).await
    }

    /// Refresh a single channel by id.
    ///
    /// # Errors
    ///
    /// [`RelayError::ChannelNotFound`] for unknown ids,
    /// [`RelayError::UnsupportedOperation`] for multi-key channels, and any
    /// probe error verbatim.
    pub async fn refresh(&self, channel_id: i64) -> Result<f64> {
        let channel = self.store.get(channel_id).await?;
        if channel.multi_key {
            return Err(RelayError::UnsupportedOperation(
                "balance query is not supported for multi-key channels".to_string(),
            ));
        }

        let balance = self.refresh_channel(&channel).await?;
        tracing::info!(
            channel_id,
            channel_type = %channel.channel_type,
            balance,
            "Channel balance refreshed"
        );
        Ok(balance)
    }

    /// Refresh every enabled single-key channel in store order.
    ///
    /// # Errors
    ///
    /// Only when the channel list itself cannot be read.
    pub async fn sweep_all(&self) -> Result<SweepReport> {
        let channels = self.store.list().await?;
        let mut report = SweepReport::default();

        for channel in &channels {
            if !channel.is_enabled() || channel.multi_key {
                report.skipped += 1;
                continue;
            }

            report.probed += 1;
            match self.refresh_channel(channel).await {
                Ok(balance) => {
                    report.updated += 1;
                    tracing::debug!(
                        channel_id = channel.id,
                        channel_type = %channel.channel_type,
                        balance,
                        "Channel balance updated"
                    );
                    if balance <= 0.0 {
                        self.report_depleted(channel, &mut report).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        channel_id = channel.id,
                        channel_type = %channel.channel_type,
                        error = %e,
                        "Channel balance refresh failed"
                    );
                    report.failures.push(SweepFailure {
                        channel_id: channel.id,
                        error: e.to_string(),
                    });
                }
            }

            self.ctx.clock.sleep(self.settings.request_interval).await;
        }

        Ok(report)
    }

    async fn report_depleted(&self, channel: &Channel, report: &mut SweepReport) {
        let fault = ChannelFault::from(channel);
        match self
            .health
            .disable_channel(&fault, REASON_INSUFFICIENT_BALANCE)
            .await
        {
            Ok(true) => report.disabled += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    channel_id = channel.id,
                    error = %e,
                    "Failed to disable depleted channel"
                );
            }
        }
    }

    /// Sweep every `frequency`, starting one period from now, until `shutdown`
    /// fires. Each run is spawned independently; a slow run does not delay
    /// or cancel the next one.
    pub async fn run_periodic(
        self: Arc<Self>,
        frequency: Duration,
        shutdown: CancellationToken,
    ) {
        let start = tokio::time::Instant::now() + frequency;
        let mut ticker = tokio::time::interval_at(start, frequency);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Balance sweep scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let service = Arc::clone(&self);
                    tokio::spawn(async move {
                        tracing::info!("updating all channels");
                        match service.sweep_all().await {
                            Ok(report) => tracing::info!(
                                probed = report.probed,
                                skipped = report.skipped,
                                failed = report.failures.len(),
                                disabled = report.disabled,
                                "channels update done"
                            ),
                            Err(e) => tracing::error!(error = %e, "Channel sweep failed"),
                        }
                    });
                }
            }
        }
    }
}
