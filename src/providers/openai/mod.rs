//! OpenAI-compatible billing endpoints.
//!
//! Three shapes live here:
//! - the two-step dashboard protocol (`subscription` then `usage`) used by
//!   OpenAI itself and by custom OpenAI-compatible deployments,
//! - the single `credit_grants` endpoint offered by several resellers,
//! - the OpenAI-SB session status endpoint.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;

use super::{BalanceProbe, ProbeContext, parse_amount, vendor_base};
use crate::core::http::{Auth, get_json, join_url, with_query};
use crate::core::models::{Channel, ChannelType};
use crate::error::{RelayError, Result};

/// Days of usage free-tier accounts report over.
pub const FREE_TIER_WINDOW_DAYS: i64 = 100;

// =============================================================================
// Subscription + Usage (two-step)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    has_payment_method: bool,
    #[serde(default)]
    hard_limit_usd: f64,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    /// Cents.
    #[serde(default)]
    total_usage: f64,
}

/// Where the two-step probe takes its base URL from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseSource {
    /// Channel override, else the OpenAI default.
    ChannelOrDefault,
    /// Channel override only.
    ChannelOnly,
}

/// Hard limit minus month-to-date (or rolling-window) usage.
#[derive(Debug, Clone)]
pub struct SubscriptionProbe {
    source: BaseSource,
}

impl SubscriptionProbe {
    /// For `openai` channels.
    #[must_use]
    pub const fn openai() -> Self {
        Self {
            source: BaseSource::ChannelOrDefault,
        }
    }

    /// For `custom` channels: the endpoint comes from the channel alone.
    #[must_use]
    pub const fn custom() -> Self {
        Self {
            source: BaseSource::ChannelOnly,
        }
    }

    fn base_url(&self, channel: &Channel) -> Result<String> {
        let base = match self.source {
            BaseSource::ChannelOrDefault => channel
                .configured_base_url()
                .or_else(|| ChannelType::OpenAI.default_base_url()),
            BaseSource::ChannelOnly => channel.configured_base_url(),
        };
        base.map(str::to_string).ok_or_else(|| RelayError::NotFound {
            what: format!("base URL for channel {}", channel.id),
        })
    }
}

/// Usage query window: month-to-date for paying accounts, otherwise the
/// trailing [`FREE_TIER_WINDOW_DAYS`]. `today` is the UTC date.
#[must_use]
pub fn usage_window(today: NaiveDate, has_payment_method: bool) -> (NaiveDate, NaiveDate) {
    let start = if has_payment_method {
        today.with_day(1).unwrap_or(today)
    } else {
        today - Duration::days(FREE_TIER_WINDOW_DAYS)
    };
    (start, today)
}

#[async_trait]
impl BalanceProbe for SubscriptionProbe {
    fn id(&self) -> &'static str {
        match self.source {
            BaseSource::ChannelOrDefault => "openai-subscription",
            BaseSource::ChannelOnly => "custom-subscription",
        }
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let base = self.base_url(channel)?;
        let auth = Auth::bearer(&channel.key);

        let url = join_url(&base, "/v1/dashboard/billing/subscription");
        let subscription: SubscriptionResponse = get_json(&ctx.client, &url, Some(&auth)).await?;

        let today = ctx.clock.now().date_naive();
        let (start, end) = usage_window(today, subscription.has_payment_method);
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let url = with_query(
            &join_url(&base, "/v1/dashboard/billing/usage"),
            &[("start_date", start.as_str()), ("end_date", end.as_str())],
        )?;
        let usage: UsageResponse = get_json(&ctx.client, &url, Some(&auth)).await?;

        tracing::debug!(
            channel_id = channel.id,
            hard_limit_usd = subscription.hard_limit_usd,
            usage_cents = usage.total_usage,
            %start,
            %end,
            "Fetched subscription usage"
        );

        Ok(subscription.hard_limit_usd - usage.total_usage / 100.0)
    }
}

// =============================================================================
// Credit Grants
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreditGrantsResponse {
    #[serde(default)]
    total_available: f64,
    #[serde(default)]
    total_remaining: f64,
}

/// Which field of a credit-grants payload holds the remaining credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantField {
    TotalAvailable,
    TotalRemaining,
}

/// Single `dashboard/billing/credit_grants` call.
#[derive(Debug, Clone)]
pub struct CreditGrantsProbe {
    id: &'static str,
    /// `None` means the channel's base URL (falling back to the type default).
    base_url: Option<String>,
    field: GrantField,
}

impl CreditGrantsProbe {
    /// CloseAI reads from the channel's own endpoint.
    #[must_use]
    pub const fn closeai() -> Self {
        Self {
            id: "closeai-credit-grants",
            base_url: None,
            field: GrantField::TotalAvailable,
        }
    }

    #[must_use]
    pub fn api2gpt() -> Self {
        Self {
            id: "api2gpt-credit-grants",
            base_url: Some(vendor_base(ChannelType::API2GPT)),
            field: GrantField::TotalRemaining,
        }
    }

    #[must_use]
    pub fn aigc2d() -> Self {
        Self {
            id: "aigc2d-credit-grants",
            base_url: Some(vendor_base(ChannelType::AIGC2D)),
            field: GrantField::TotalAvailable,
        }
    }

    /// Point a fixed-endpoint probe somewhere else.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[async_trait]
impl BalanceProbe for CreditGrantsProbe {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => channel
                .effective_base_url()
                .map(str::to_string)
                .ok_or_else(|| RelayError::NotFound {
                    what: format!("base URL for channel {}", channel.id),
                })?,
        };
        let url = join_url(&base, "/dashboard/billing/credit_grants");
        let grants: CreditGrantsResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;

        Ok(match self.field {
            GrantField::TotalAvailable => grants.total_available,
            GrantField::TotalRemaining => grants.total_remaining,
        })
    }
}

// =============================================================================
// OpenAI-SB
// =============================================================================

#[derive(Debug, Deserialize)]
struct SbStatusResponse {
    #[serde(default)]
    msg: String,
    data: Option<SbStatusData>,
}

#[derive(Debug, Deserialize)]
struct SbStatusData {
    credit: String,
}

/// OpenAI-SB reports credit as a string and signals failure by omitting `data`.
#[derive(Debug, Clone)]
pub struct OpenAISBProbe {
    base_url: String,
}

impl OpenAISBProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(vendor_base(ChannelType::OpenAISB))
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenAISBProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceProbe for OpenAISBProbe {
    fn id(&self) -> &'static str {
        "openaisb-status"
    }

    async fn probe(&self, ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        let url = with_query(
            &join_url(&self.base_url, "/sb-api/user/status"),
            &[("api_key", channel.key.as_str())],
        )?;
        let response: SbStatusResponse =
            get_json(&ctx.client, &url, Some(&Auth::bearer(&channel.key))).await?;

        let data = response
            .data
            .ok_or_else(|| RelayError::upstream("openaisb", "", response.msg))?;
        parse_amount("openaisb", &data.credit)
    }
}
