//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::models::ResponseFormat;

/// Relay billing - channel balance reconciliation and async job completion.
#[derive(Parser, Debug)]
#[command(name = "relaybill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Channel records file (JSON array)
    #[arg(long, value_name = "PATH", global = true)]
    pub channels: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh one channel's balance
    Refresh(RefreshArgs),

    /// Refresh every enabled channel and disable depleted ones
    RefreshAll,

    /// Run the periodic balance sweep until interrupted
    Daemon(DaemonArgs),

    /// Async job commands
    #[command(subcommand)]
    Job(JobCommand),
}

/// Arguments for the `refresh` command.
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Channel id
    pub id: i64,
}

/// Arguments for the `daemon` command.
#[derive(Parser, Debug)]
pub struct DaemonArgs {
    /// Sweep period in minutes (overrides config)
    #[arg(long, value_name = "MINUTES")]
    pub frequency: Option<u64>,
}

/// Async job subcommands.
#[derive(Subcommand, Debug)]
pub enum JobCommand {
    /// Poll a submitted image task and print the canonical response
    Wait(JobWaitArgs),
}

/// Arguments for `job wait`.
#[derive(Parser, Debug)]
pub struct JobWaitArgs {
    /// Task id returned by the submit call
    pub task_id: String,

    /// Vendor base URL
    #[arg(long, value_name = "URL", default_value = "https://dashscope.aliyuncs.com")]
    pub base_url: String,

    /// API key
    #[arg(long, env = "RELAYBILL_JOB_KEY", hide_env_values = true)]
    pub key: String,

    /// Output encoding of result items
    #[arg(long, value_enum, default_value = "url")]
    pub format: OutputEncoding,
}

/// Output encoding for job results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputEncoding {
    /// Remote references
    Url,
    /// Embedded base64
    #[value(name = "b64_json")]
    B64Json,
}

impl From<OutputEncoding> for ResponseFormat {
    fn from(value: OutputEncoding) -> Self {
        match value {
            OutputEncoding::Url => Self::Url,
            OutputEncoding::B64Json => Self::B64Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_refresh_with_globals() {
        let cli = Cli::parse_from(["relaybill", "refresh", "12", "--channels", "c.json", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.channels, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Commands::Refresh(RefreshArgs { id: 12 })));
    }

    #[test]
    fn parses_job_wait() {
        let cli = Cli::parse_from([
            "relaybill", "job", "wait", "task-1", "--key", "sk", "--format", "b64_json",
        ]);
        match cli.command {
            Commands::Job(JobCommand::Wait(args)) => {
                assert_eq!(args.task_id, "task-1");
                assert_eq!(ResponseFormat::from(args.format), ResponseFormat::B64Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
