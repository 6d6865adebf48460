//! Channel health collaborator.
//!
//! The sweep reports depleted channels here. Whether the channel actually
//! leaves rotation is this collaborator's call: the default implementation
//! honors the channel's auto-disable flag.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::models::{Channel, ChannelStatus, ChannelType};
use super::store::ChannelStore;
use crate::error::Result;

/// Reason passed when a sweep finds no credit left.
pub const REASON_INSUFFICIENT_BALANCE: &str = "insufficient balance";

/// Identity of a channel being reported unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelFault {
    pub channel_id: i64,
    pub channel_type: ChannelType,
    pub channel_name: String,
    pub multi_key: bool,
    pub auto_ban: bool,
}

impl From<&Channel> for ChannelFault {
    fn from(channel: &Channel) -> Self {
        Self {
            channel_id: channel.id,
            channel_type: channel.channel_type,
            channel_name: channel.name.clone(),
            multi_key: channel.multi_key,
            auto_ban: channel.auto_ban,
        }
    }
}

/// Decides whether a faulty channel leaves rotation.
#[async_trait]
pub trait ChannelHealth: Send + Sync {
    /// Report a channel as unhealthy for `reason`. Returns whether it was disabled.
    async fn disable_channel(&self, fault: &ChannelFault, reason: &str) -> Result<bool>;
}

/// Disables channels through the channel store, skipping those that opted out
/// of automatic disabling.
pub struct StoreChannelHealth {
    store: Arc<dyn ChannelStore>,
}

impl StoreChannelHealth {
    #[must_use]
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChannelHealth for StoreChannelHealth {
    async fn disable_channel(&self, fault: &ChannelFault, reason: &str) -> Result<bool> {
        if !fault.auto_ban {
            tracing::info!(
                channel_id = fault.channel_id,
                channel_name = %fault.channel_name,
                reason,
                "Channel opted out of auto-disable, leaving enabled"
            );
            return Ok(false);
        }

        self.store
            .update_status(fault.channel_id, ChannelStatus::Disabled)
            .await?;
        tracing::warn!(
            channel_id = fault.channel_id,
            channel_type = %fault.channel_type,
            channel_name = %fault.channel_name,
            reason,
            "Channel disabled"
        );
        Ok(true)
    }
}
