//! Shared helpers for integration tests.
//!
//! - `logger`: per-test phase logging
//! - `log_capture`: assert on tracing events emitted by the crate
//!
//! Domain factories (channels, clocks, fake probes) live in
//! `relaybill::test_utils`.

#![allow(dead_code)]

pub mod log_capture;
pub mod logger;

use relaybill::core::ChannelStatus;
use relaybill::core::store::MemoryChannelStore;

/// Current status of channel `id` in `store`.
pub fn status_of(store: &MemoryChannelStore, id: i64) -> ChannelStatus {
    store
        .snapshot()
        .into_iter()
        .find(|c| c.id == id)
        .map(|c| c.status)
        .unwrap_or_else(|| panic!("channel {id} missing"))
}

/// Stored balance of channel `id` in `store`.
pub fn balance_of(store: &MemoryChannelStore, id: i64) -> f64 {
    store
        .snapshot()
        .into_iter()
        .find(|c| c.id == id)
        .map(|c| c.balance)
        .unwrap_or_else(|| panic!("channel {id} missing"))
}
