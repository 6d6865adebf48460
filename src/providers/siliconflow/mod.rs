//! SiliconFlow account balance.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, parse_amount, vendor_base};
use crate::core::http::{Auth, get_json, join_url};
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

/// SiliconFlow's success code.
const CODE_OK: i64 = 20000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    #[serde(default)]
    total_balance: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<UserInfo>,
}

#[derive(Debug, Clone)]
pub struct SiliconFlowProbe {
    base_url: String,
}

impl SiliconFlowProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::SiliconFlow))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for SiliconFlowProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for SiliconFlowProbe {
    fn id(&self) -> &'static str {
        "siliconflow-user-info"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = join_url(&self.base_url, "/v1/user/info");
        let response: UserInfoResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;

        if response.code != CODE_OK {
            return Err(RelayError::upstream(
                "siliconflow",
                response.code,
                response.message,
            ));
        }
        let data = response.data.ok_or_else(|| RelayError::NotFound {
            what: "siliconflow user info".to_string(),
        })?;
        parse_amount("siliconflow", &data.total_balance)
    }
}
