//! Test utilities for relaybill.
//!
//! Provides factories, stub probes, a recording health collaborator and a
//! manual clock for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relaybill::test_utils::*;
//!
//! let channel = make_test_channel(1, ChannelType::DeepSeek);
//! let clock = ManualClock::default();
//! let ctx = make_test_probe_context().with_clock(Arc::new(clock.clone()));
//! ```

use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::core::clock::Clock;
use crate::core::currency::ExchangeRate;
use crate::core::health::{ChannelFault, ChannelHealth};
use crate::core::http::default_client;
use crate::core::models::{Channel, ChannelStatus, ChannelType};
use crate::error::{RelayError, Result};
use crate::providers::{BalanceProbe, ProbeContext};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create an enabled single-key channel with auto-disable on.
#[must_use]
pub fn make_test_channel(id: i64, channel_type: ChannelType) -> Channel {
    Channel {
        id,
        name: format!("{}-{id}", channel_type.tag()),
        channel_type,
        key: format!("sk-test-{id}"),
        base_url: None,
        status: ChannelStatus::Enabled,
        multi_key: false,
        auto_ban: true,
        balance: 0.0,
        balance_updated_at: None,
    }
}

/// Same as [`make_test_channel`] but pointed at `base_url`.
#[must_use]
pub fn make_test_channel_at(id: i64, channel_type: ChannelType, base_url: &str) -> Channel {
    Channel {
        base_url: Some(base_url.to_string()),
        ..make_test_channel(id, channel_type)
    }
}

/// Probe context with a real HTTP client, rate 7.3 and a [`ManualClock`].
///
/// # Panics
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn make_test_probe_context() -> ProbeContext {
    ProbeContext::new(
        default_client().expect("client build"),
        ExchangeRate::default(),
    )
    .with_clock(Arc::new(ManualClock::default()))
}

/// Write `channels` to a temporary JSON file for the file-backed store.
///
/// # Panics
/// Panics on filesystem errors.
#[must_use]
pub fn write_channels_file(channels: &[Channel]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    let json = serde_json::to_string_pretty(channels).expect("serialize channels");
    file.write_all(json.as_bytes()).expect("write channels");
    file.flush().expect("flush channels");
    file
}

// =============================================================================
// Manual Clock
// =============================================================================

/// Clock frozen at a fixed instant whose sleeps return immediately and are recorded.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every sleep requested so far.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::from_std(duration).unwrap_or_default();
        }
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Stub Probe
// =============================================================================

type ErrorFactory = Box<dyn Fn() -> RelayError + Send + Sync>;

/// Probe returning a fixed value (or error) and recording which channels it saw.
pub struct FixedProbe {
    outcome: std::result::Result<f64, ErrorFactory>,
    calls: Arc<Mutex<Vec<i64>>>,
}

impl FixedProbe {
    #[must_use]
    pub fn ok(balance: f64) -> Self {
        Self {
            outcome: Ok(balance),
            calls: Arc::default(),
        }
    }

    pub fn err(make: impl Fn() -> RelayError + Send + Sync + 'static) -> Self {
        Self {
            outcome: Err(Box::new(make)),
            calls: Arc::default(),
        }
    }

    /// Shared handle to the recorded channel ids.
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<Vec<i64>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl BalanceProbe for FixedProbe {
    fn id(&self) -> &'static str {
        "fixed"
    }

    async fn probe(&self, _ctx: &ProbeContext, channel: &Channel) -> Result<f64> {
        self.calls.lock().unwrap().push(channel.id);
        match &self.outcome {
            Ok(balance) => Ok(*balance),
            Err(make) => Err(make()),
        }
    }
}

// =============================================================================
// Recording Health Collaborator
// =============================================================================

/// Health collaborator that records every disable request and always disables.
#[derive(Debug, Default)]
pub struct RecordingHealth {
    calls: Mutex<Vec<(ChannelFault, String)>>,
}

impl RecordingHealth {
    /// Recorded `(fault, reason)` pairs.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<(ChannelFault, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelHealth for RecordingHealth {
    async fn disable_channel(&self, fault: &ChannelFault, reason: &str) -> Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push((fault.clone(), reason.to_string()));
        Ok(true)
    }
}
