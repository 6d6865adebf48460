//! Vendor balance probes.
//!
//! Each vendor family has its own submodule implementing [`BalanceProbe`].
//! [`ProbeRegistry`] maps channel types to probes; adding a vendor means
//! registering one more entry, not editing a dispatch block.

pub mod aiproxy;
pub mod ali;
pub mod deepseek;
pub mod moonshot;
pub mod openai;
pub mod openrouter;
pub mod siliconflow;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::clock::{Clock, SystemClock};
use crate::core::currency::ExchangeRate;
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

/// Shared resources handed to every probe call.
#[derive(Clone)]
pub struct ProbeContext {
    pub client: Client,
    pub exchange_rate: ExchangeRate,
    pub clock: Arc<dyn Clock>,
}

impl ProbeContext {
    #[must_use]
    pub fn new(client: Client, exchange_rate: ExchangeRate) -> Self {
        Self {
            client,
            exchange_rate,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for ProbeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeContext")
            .field("exchange_rate", &self.exchange_rate)
            .finish_non_exhaustive()
    }
}

/// Fetches a channel's remaining credit and normalizes it to the canonical unit.
#[async_trait]
pub trait BalanceProbe: Send + Sync {
    /// Short identifier for logs.
    fn id(&self) -> &'static str;

    /// Query the vendor. Never mutates the channel.
    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64>;
}

/// Probe for a type whose billing API is known but gated; always fails.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedProbe {
    pub channel_type: ChannelType,
}

#[async_trait]
impl BalanceProbe for UnimplementedProbe {
    fn id(&self) -> &'static str {
        "unimplemented"
    }

    async fn probe(&self, _ctx: &ProbeContext, _channel: &Channel) -> Result<f64> {
        Err(RelayError::NotImplemented {
            channel_type: self.channel_type.tag().to_string(),
        })
    }
}

/// Channel type to probe mapping.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: HashMap<ChannelType, Arc<dyn BalanceProbe>>,
}

impl ProbeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in vendor probe.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ChannelType::OpenAI, openai::SubscriptionProbe::openai());
        registry.register(ChannelType::Custom, openai::SubscriptionProbe::custom());
        registry.register(ChannelType::CloseAI, openai::CreditGrantsProbe::closeai());
        registry.register(ChannelType::API2GPT, openai::CreditGrantsProbe::api2gpt());
        registry.register(ChannelType::AIGC2D, openai::CreditGrantsProbe::aigc2d());
        registry.register(ChannelType::OpenAISB, openai::OpenAISBProbe::new());
        registry.register(ChannelType::AIProxy, aiproxy::AIProxyProbe::new());
        registry.register(ChannelType::SiliconFlow, siliconflow::SiliconFlowProbe::new());
        registry.register(ChannelType::DeepSeek, deepseek::DeepSeekProbe::new());
        registry.register(ChannelType::OpenRouter, openrouter::OpenRouterProbe::new());
        registry.register(ChannelType::Moonshot, moonshot::MoonshotProbe::new());
        registry.register(
            ChannelType::Azure,
            UnimplementedProbe {
                channel_type: ChannelType::Azure,
            },
        );
        registry
    }

    /// Register (or replace) the probe for a channel type.
    pub fn register<P: BalanceProbe + 'static>(&mut self, channel_type: ChannelType, probe: P) {
        self.probes.insert(channel_type, Arc::new(probe));
    }

    #[must_use]
    pub fn get(&self, channel_type: ChannelType) -> Option<&Arc<dyn BalanceProbe>> {
        self.probes.get(&channel_type)
    }

    /// Channel types with a registered probe.
    #[must_use]
    pub fn channel_types(&self) -> Vec<ChannelType> {
        ChannelType::ALL
            .iter()
            .copied()
            .filter(|t| self.probes.contains_key(t))
            .collect()
    }

    /// Dispatch to the probe registered for the channel's type.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotImplemented`] for unregistered types, otherwise
    /// whatever the probe returns.
    pub async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let probe = self
            .get(channel.channel_type)
            .ok_or_else(|| RelayError::NotImplemented {
                channel_type: channel.channel_type.tag().to_string(),
            })?;

        tracing::debug!(
            channel_id = channel.id,
            channel_type = %channel.channel_type,
            probe = probe.id(),
            "Probing channel balance"
        );
        probe.probe(ctx, channel).await
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("channel_types", &self.channel_types())
            .finish()
    }
}

/// Default base URL of a vendor type, empty when it has none.
pub(crate) fn vendor_base(channel_type: ChannelType) -> String {
    channel_type
        .default_base_url()
        .unwrap_or_default()
        .to_string()
}

/// Parse a vendor's string-encoded amount.
pub(crate) fn parse_amount(vendor: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| RelayError::decode(format!("{vendor} balance {raw:?}"), e))
}
