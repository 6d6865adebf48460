//! Core data models and balance/job infrastructure.

pub mod balance;
pub mod clock;
pub mod currency;
pub mod health;
pub mod http;
pub mod job_poller;
pub mod logging;
pub mod models;
pub mod store;
pub mod translate;

pub use balance::{BalanceService, BalanceUpdater, SweepFailure, SweepReport, SweepSettings};
pub use clock::{Clock, SystemClock};
pub use currency::ExchangeRate;
pub use health::{ChannelFault, ChannelHealth, StoreChannelHealth};
pub use job_poller::{AsyncJob, JobPoller, PollPolicy, TaskSnapshot, TaskSource, TaskStatus};
pub use models::{Channel, ChannelStatus, ChannelType, ImageData, ImageResponse, ResponseFormat};
pub use store::{ChannelStore, MemoryChannelStore};
pub use translate::{AssetFetcher, HttpAssetFetcher, OutputItem};
