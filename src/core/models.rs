//! Core data models.
//!
//! Channel records are owned by an external store; this crate only reads
//! them and writes back the balance field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Channel Type
// =============================================================================

/// Upstream vendor family of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    OpenAI,
    Azure,
    Custom,
    CloseAI,
    OpenAISB,
    AIProxy,
    API2GPT,
    AIGC2D,
    SiliconFlow,
    DeepSeek,
    OpenRouter,
    Moonshot,
    Ali,
    Anthropic,
    Gemini,
}

impl ChannelType {
    /// All channel types.
    pub const ALL: &'static [Self] = &[
        Self::OpenAI,
        Self::Azure,
        Self::Custom,
        Self::CloseAI,
        Self::OpenAISB,
        Self::AIProxy,
        Self::API2GPT,
        Self::AIGC2D,
        Self::SiliconFlow,
        Self::DeepSeek,
        Self::OpenRouter,
        Self::Moonshot,
        Self::Ali,
        Self::Anthropic,
        Self::Gemini,
    ];

    /// Stable tag used in config files and logs.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Custom => "custom",
            Self::CloseAI => "closeai",
            Self::OpenAISB => "openaisb",
            Self::AIProxy => "aiproxy",
            Self::API2GPT => "api2gpt",
            Self::AIGC2D => "aigc2d",
            Self::SiliconFlow => "siliconflow",
            Self::DeepSeek => "deepseek",
            Self::OpenRouter => "openrouter",
            Self::Moonshot => "moonshot",
            Self::Ali => "ali",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Vendor default base URL, used when the channel has no override.
    #[must_use]
    pub const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com"),
            Self::CloseAI => Some("https://api.closeai-proxy.xyz"),
            Self::OpenAISB => Some("https://api.openai-sb.com"),
            Self::AIProxy => Some("https://aiproxy.io"),
            Self::API2GPT => Some("https://api.api2gpt.com"),
            Self::AIGC2D => Some("https://api.aigc2d.com"),
            Self::SiliconFlow => Some("https://api.siliconflow.cn"),
            Self::DeepSeek => Some("https://api.deepseek.com"),
            Self::OpenRouter => Some("https://openrouter.ai/api"),
            Self::Moonshot => Some("https://api.moonshot.cn"),
            Self::Ali => Some("https://dashscope.aliyuncs.com"),
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com"),
            Self::Azure | Self::Custom => None,
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Routing status of a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Enabled,
    Disabled,
}

/// A configured upstream provider credential/endpoint pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub status: ChannelStatus,
    /// Channel rotates several keys; its credit is not a single value.
    #[serde(default)]
    pub multi_key: bool,
    /// Channel may be disabled automatically by health checks.
    #[serde(default = "default_auto_ban")]
    pub auto_ban: bool,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_updated_at: Option<DateTime<Utc>>,
}

const fn default_auto_ban() -> bool {
    true
}

impl Channel {
    /// The channel's own base URL override, if set and non-empty.
    #[must_use]
    pub fn configured_base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Base URL to use: the override, else the vendor default.
    #[must_use]
    pub fn effective_base_url(&self) -> Option<&str> {
        self.configured_base_url()
            .or_else(|| self.channel_type.default_base_url())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status == ChannelStatus::Enabled
    }
}

// =============================================================================
// Canonical Job Result
// =============================================================================

/// Requested encoding of job output items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Pass the remote reference through.
    #[default]
    Url,
    /// Fetch each asset and embed it as base64.
    B64Json,
}

/// One output item of a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub b64_json: String,
    #[serde(default)]
    pub revised_prompt: String,
}

/// Vendor-independent result of a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
}
