//! relaybill - channel balance reconciliation and async job completion for
//! an LLM API gateway.
//!
//! Probes each upstream vendor's billing endpoint, normalizes the remaining
//! credit to USD, disables depleted channels, and turns polled vendor image
//! tasks into OpenAI-style image responses.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod providers;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, RelayError, Result};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
