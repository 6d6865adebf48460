//! Keyed channel store.
//!
//! Channel records live outside this crate. The [`ChannelStore`] trait is the
//! seam; [`MemoryChannelStore`] backs tests and the JSON file store.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Channel, ChannelStatus};
use crate::error::{RelayError, Result};

/// External keyed store of channel records.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Look up one channel.
    async fn get(&self, id: i64) -> Result<Channel>;

    /// Every channel, in store order.
    async fn list(&self) -> Result<Vec<Channel>>;

    /// Overwrite the balance field.
    async fn update_balance(&self, id: i64, balance: f64, at: DateTime<Utc>) -> Result<()>;

    /// Overwrite the status field.
    async fn update_status(&self, id: i64, status: ChannelStatus) -> Result<()>;
}

/// In-memory store preserving insertion order.
#[derive(Debug, Default)]
pub struct MemoryChannelStore {
    channels: RwLock<Vec<Channel>>,
}

impl MemoryChannelStore {
    #[must_use]
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels: RwLock::new(channels),
        }
    }

    /// Copy of the current records.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Channel> {
        self.channels
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn with_channel<T>(&self, id: i64, f: impl FnOnce(&mut Channel) -> T) -> Result<T> {
        let mut guard = self
            .channels
            .write()
            .map_err(|_| RelayError::Other(anyhow::anyhow!("channel store lock poisoned")))?;
        guard
            .iter_mut()
            .find(|c| c.id == id)
            .map(f)
            .ok_or(RelayError::ChannelNotFound(id))
    }
}

#[async_trait]
impl ChannelStore for MemoryChannelStore {
    async fn get(&self, id: i64) -> Result<Channel> {
        self.with_channel(id, |c| c.clone())
    }

    async fn list(&self) -> Result<Vec<Channel>> {
        Ok(self.snapshot())
    }

    async fn update_balance(&self, id: i64, balance: f64, at: DateTime<Utc>) -> Result<()> {
        self.with_channel(id, |c| {
            c.balance = balance;
            c.balance_updated_at = Some(at);
        })
    }

    async fn update_status(&self, id: i64, status: ChannelStatus) -> Result<()> {
        self.with_channel(id, |c| c.status = status)
    }
}
