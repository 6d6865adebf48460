//! DeepSeek balance.
//!
//! The payload lists one row per currency; only the `CNY` row is read and its
//! value is passed through unconverted.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, parse_amount, vendor_base};
use crate::core::http::{Auth, get_json, join_url};
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

/// Currency row the balance is read from.
pub const BALANCE_CURRENCY: &str = "CNY";

#[derive(Debug, Deserialize)]
struct BalanceInfo {
    currency: String,
    #[serde(default)]
    total_balance: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    balance_infos: Vec<BalanceInfo>,
}

#[derive(Debug, Clone)]
pub struct DeepSeekProbe {
    base_url: String,
}

impl DeepSeekProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::DeepSeek))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for DeepSeekProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for DeepSeekProbe {
    fn id(&self) -> &'static str {
        "deepseek-balance"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = join_url(&self.base_url, "/user/balance");
        let response: BalanceResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;

        let row = response
            .balance_infos
            .iter()
            .find(|info| info.currency == BALANCE_CURRENCY)
            .ok_or_else(|| RelayError::NotFound {
                what: format!("currency {BALANCE_CURRENCY}"),
            })?;
        parse_amount("deepseek", &row.total_balance)
    }
}
