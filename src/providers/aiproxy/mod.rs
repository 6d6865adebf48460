//! AIProxy points balance.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, vendor_base};
use crate::core::http::{Auth, get_json, join_url};
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewData {
    #[serde(default)]
    total_points: f64,
}

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    data: Option<OverviewData>,
}

/// Authenticates with an `Api-Key` header rather than a bearer token.
#[derive(Debug, Clone)]
pub struct AIProxyProbe {
    base_url: String,
}

impl AIProxyProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::AIProxy))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for AIProxyProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for AIProxyProbe {
    fn id(&self) -> &'static str {
        "aiproxy-overview"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = join_url(&self.base_url, "/api/report/getUserOverview");
        let auth = Auth::Header {
            name: "Api-Key",
            value: channel.key.clone(),
        };
        let response: OverviewResponse = get_json(&ctx.client, &url, Some(&auth)).await?;

        if !response.success {
            return Err(RelayError::upstream(
                "aiproxy",
                response.error_code,
                response.message,
            ));
        }
        Ok(response.data.map_or(0.0, |d| d.total_points))
    }
}
