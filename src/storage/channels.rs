//! JSON-file channel store.
//!
//! Reads an array of channel records once and rewrites the whole file after
//! every balance or status write. Stands in for the gateway's database when
//! the CLI runs standalone.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::models::{Channel, ChannelStatus};
use crate::core::store::{ChannelStore, MemoryChannelStore};
use crate::error::{RelayError, Result};

/// Channel store persisted to a JSON file.
#[derive(Debug)]
pub struct FileChannelStore {
    path: PathBuf,
    inner: MemoryChannelStore,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileChannelStore {
    /// Load channels from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the file is missing or not a JSON
    /// array of channels.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read channels file {}: {e}", path.display()))
        })?;
        let channels: Vec<Channel> = serde_json::from_str(&content).map_err(|e| {
            RelayError::Config(format!("invalid channels file {}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), count = channels.len(), "Loaded channels");
        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryChannelStore::new(channels),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for FileChannelStore {
    async fn get(&self, id: i64) -> Result<Channel> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<Channel>> {
        self.inner.list().await
    }

    async fn update_balance(&self, id: i64, balance: f64, at: DateTime<Utc>) -> Result<()> {
        self.inner.update_balance(id, balance, at).await?;
        self.persist().await
    }

    async fn update_status(&self, id: i64, status: ChannelStatus) -> Result<()> {
        self.inner.update_status(id, status).await?;
        self.persist().await
    }
}
