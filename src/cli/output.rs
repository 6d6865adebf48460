//! JSON result envelope printed by every balance command.

use serde::Serialize;

use crate::core::balance::SweepReport;
use crate::error::{RelayError, Result};

/// `{success, message, balance?}` result of a command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
}

impl CommandOutput {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            balance: None,
            code: None,
            report: None,
        }
    }

    #[must_use]
    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = Some(balance);
        self
    }

    #[must_use]
    pub fn with_report(mut self, report: SweepReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Failure envelope carrying the error text and its stable code.
    #[must_use]
    pub fn failure(err: &RelayError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            balance: None,
            code: Some(err.error_code()),
            report: None,
        }
    }
}

/// Serialize any value as compact or pretty JSON.
///
/// # Errors
///
/// Returns [`RelayError::Json`] if serialization fails.
pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
