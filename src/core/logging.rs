//! Logging setup.
//!
//! Human, compact or JSON-lines output to stderr or a file. The level comes
//! from `--log-level`, then `RELAYBILL_LOG`, then the config file; `RUST_LOG`
//! overrides all of them when set.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_LEVEL_ENV: &str = "RELAYBILL_LOG";
const LOG_FORMAT_ENV: &str = "RELAYBILL_LOG_FORMAT";
const LOG_FILE_ENV: &str = "RELAYBILL_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact logs (single line, terse).
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Parse a level name; accepts `verbose` as debug and `warning` as warn.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "verbose" | "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Human,
            file: None,
        }
    }
}

impl LogSettings {
    /// Merge CLI values, environment and the config file default.
    ///
    /// `verbose` raises the level to at least debug; `json_output` forces JSON.
    #[must_use]
    pub fn resolve(
        cli_level: Option<&str>,
        config_level: Option<&str>,
        json_output: bool,
        verbose: bool,
    ) -> Self {
        let mut level = cli_level
            .and_then(parse_level)
            .or_else(|| env_value(LOG_LEVEL_ENV).as_deref().and_then(parse_level))
            .or_else(|| config_level.and_then(parse_level))
            .unwrap_or(Level::INFO);
        if verbose && level < Level::DEBUG {
            level = Level::DEBUG;
        }

        let format = if json_output {
            LogFormat::Json
        } else {
            env_value(LOG_FORMAT_ENV)
                .as_deref()
                .and_then(LogFormat::from_arg)
                .unwrap_or_default()
        };

        Self {
            level,
            format,
            file: env_value(LOG_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(settings: &LogSettings) {
    let file = settings.file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    let writer = match file {
        Some(file) => BoxMakeWriter::new(file),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "relaybill={}",
            settings.level.as_str().to_lowercase()
        ))
    });

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .with_span_events(FmtSpan::CLOSE)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_writer(writer)
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(false)
                .try_init()
                .ok();
        }
    }
}
