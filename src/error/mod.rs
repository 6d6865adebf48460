//! Error types for relaybill.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Transport**: Network failures reaching a vendor, malformed vendor payloads
//! - **Upstream**: The vendor answered but reported a failure, or never finished
//! - **Channel**: Unsupported channel shapes, unknown channels, missing probes
//! - **Configuration**: Config file parsing or validation
//! - **Internal**: Unexpected errors and I/O
//!
//! Each error has a stable error code (e.g., `RB-T001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network or decode failures talking to a vendor.
    Transport,
    /// Vendor-reported failures, timeouts and cancellations.
    Upstream,
    /// Channel lookup and capability errors.
    Channel,
    /// Configuration issues (parse errors, invalid values).
    Configuration,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Transport error",
            Self::Upstream => "Upstream error",
            Self::Channel => "Channel error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Transport => "T",
            Self::Upstream => "U",
            Self::Channel => "C",
            Self::Configuration => "F",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Vendor unreachable or answered with garbage
    TransportError = 2,
    /// Vendor reported a failure
    UpstreamError = 3,
    /// Polling ran out of attempts
    Timeout = 4,
    /// Bad configuration
    ConfigError = 5,
}

/// Main error type for relaybill operations.
#[derive(Error, Debug)]
pub enum RelayError {
    // ==========================================================================
    // Transport errors
    // ==========================================================================
    /// Network/IO failure or non-2xx status reaching a vendor.
    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Malformed or unexpected JSON from a vendor.
    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    // ==========================================================================
    // Upstream errors
    // ==========================================================================
    /// Vendor reported a semantic failure through its own flag/code/message.
    #[error("{vendor} reported failure (code: {code}): {message}")]
    Upstream {
        vendor: String,
        code: String,
        message: String,
    },

    /// Async job never reached a terminal status.
    #[error("async task {task_id} did not finish after {attempts} attempts")]
    Timeout { task_id: String, attempts: u32 },

    /// Async job polling was canceled by the caller.
    #[error("async task {task_id} polling canceled")]
    Canceled { task_id: String },

    // ==========================================================================
    // Channel errors
    // ==========================================================================
    /// Channel type has no balance probe.
    #[error("balance query not implemented for channel type {channel_type}")]
    NotImplemented { channel_type: String },

    /// A required sub-field of a vendor payload or channel record is absent.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The operation does not apply to this channel.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Channel id unknown to the store.
    #[error("channel {0} not found")]
    ChannelNotFound(i64),

    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure on our side.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Shorthand for an upstream failure.
    pub fn upstream(
        vendor: impl Into<String>,
        code: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            vendor: vendor.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a decode failure.
    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Map to the CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Transport { .. } | Self::Decode { .. } => ExitCode::TransportError,
            Self::Upstream { .. } => ExitCode::UpstreamError,
            Self::Timeout { .. } => ExitCode::Timeout,
            Self::Config(_) => ExitCode::ConfigError,
            _ => ExitCode::GeneralError,
        }
    }

    /// Category for classification.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Decode { .. } => ErrorCategory::Transport,
            Self::Upstream { .. } | Self::Timeout { .. } | Self::Canceled { .. } => {
                ErrorCategory::Upstream
            }
            Self::NotImplemented { .. }
            | Self::NotFound { .. }
            | Self::UnsupportedOperation(_)
            | Self::ChannelNotFound(_) => ErrorCategory::Channel,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Stable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "RB-T001",
            Self::Decode { .. } => "RB-T002",
            Self::Upstream { .. } => "RB-U001",
            Self::Timeout { .. } => "RB-U002",
            Self::Canceled { .. } => "RB-U003",
            Self::NotImplemented { .. } => "RB-C001",
            Self::NotFound { .. } => "RB-C002",
            Self::UnsupportedOperation(_) => "RB-C003",
            Self::ChannelNotFound(_) => "RB-C004",
            Self::Config(_) => "RB-F001",
            Self::Io(_) => "RB-X001",
            Self::Json(_) => "RB-X002",
            Self::Other(_) => "RB-X999",
        }
    }

    /// Whether retrying the same call later could succeed.
    ///
    /// Only transport failures and polling timeouts qualify; everything else
    /// is a property of the channel or the vendor's answer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for relaybill operations.
pub type Result<T> = std::result::Result<T, RelayError>;
