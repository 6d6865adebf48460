//! Storage for configuration and channel records.

pub mod channels;
pub mod config;
pub mod paths;

pub use channels::FileChannelStore;
pub use config::{
    Config, ENV_CONFIG, ENV_EXCHANGE_RATE, ENV_REQUEST_INTERVAL_MS, ENV_SWEEP_FREQUENCY,
    ENV_TIMEOUT,
};
pub use paths::AppPaths;
