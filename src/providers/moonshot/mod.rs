//! Moonshot balance, reported in CNY and converted with the configured rate.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, vendor_base};
use crate::core::http::{Auth, get_json, join_url};
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

#[derive(Debug, Default, Deserialize)]
struct BalanceData {
    #[serde(default)]
    available_balance: f64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: BalanceData,
    #[serde(default)]
    scode: String,
    #[serde(default)]
    status: bool,
}

#[derive(Debug, Clone)]
pub struct MoonshotProbe {
    base_url: String,
}

impl MoonshotProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::Moonshot))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for MoonshotProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for MoonshotProbe {
    fn id(&self) -> &'static str {
        "moonshot-balance"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = join_url(&self.base_url, "/v1/users/me/balance");
        let response: BalanceResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;

        if !response.status || response.code != 0 {
            return Err(RelayError::upstream(
                "moonshot",
                response.code,
                format!("status: {}, scode: {}", response.status, response.scode),
            ));
        }

        let cny = response.data.available_balance;
        let usd = ctx.exchange_rate.to_canonical(cny)?;
        tracing::debug!(
            channel_id = channel.id,
            cny,
            usd,
            rate = %ctx.exchange_rate.as_decimal(),
            "Converted moonshot balance"
        );
        Ok(usd)
    }
}
