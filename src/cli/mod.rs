//! CLI argument parsing and command dispatch.

pub mod args;
pub mod balance;
pub mod job;
pub mod output;

pub use args::{Cli, Commands, JobCommand};
pub use output::CommandOutput;
