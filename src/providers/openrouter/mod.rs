//! OpenRouter credits: purchased minus used.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, vendor_base};
use crate::core::http::{Auth, get_json, join_url};
use crate::core::models::{Channel, ChannelType};
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
struct CreditsData {
    #[serde(default)]
    total_credits: f64,
    #[serde(default)]
    total_usage: f64,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    data: CreditsData,
}

#[derive(Debug, Clone)]
pub struct OpenRouterProbe {
    base_url: String,
}

impl OpenRouterProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::OpenRouter))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenRouterProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for OpenRouterProbe {
    fn id(&self) -> &'static str {
        "openrouter-credits"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = join_url(&self.base_url, "/v1/credits");
        let response: CreditsResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;
        Ok(response.data.total_credits - response.data.total_usage)
    }
}
