//! Per-test structured logging.
#![allow(dead_code)]
//!
//! `TestLogger` prints phase markers and elapsed time to stderr so a failing
//! integration test shows where it was. `TEST_LOG_LEVEL` (trace..error,
//! default info) filters output; `TEST_LOG_JSON=1` switches to JSON lines.
//!
//! ```rust,ignore
//! let log = TestLogger::new("sweep_disables_depleted_channel");
//! log.phase("setup");
//! log.phase("execute");
//! log.finish_ok();
//! ```

use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    level: LogLevel,
    test: &'a str,
    phase: &'a str,
    message: &'a str,
    elapsed_ms: u128,
}

struct Settings {
    min_level: LogLevel,
    json: bool,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| Settings {
        min_level: std::env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(LogLevel::Info),
        json: std::env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v == "true"),
    })
}

/// Per-test logger with phase tracking.
pub struct TestLogger {
    test_name: String,
    start: Instant,
    phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start: Instant::now(),
            phase: Mutex::new("init".to_string()),
        };
        logger.log(LogLevel::Info, "Test starting");
        logger
    }

    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.to_string();
        }
        self.log(LogLevel::Debug, &format!("Phase: {phase}"));
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Record an outbound request made by the test.
    pub fn http_request(&self, method: &str, url: &str) {
        self.log(LogLevel::Debug, &format!("{method} {url}"));
    }

    pub fn finish_ok(&self) {
        self.log(LogLevel::Info, "Test passed");
    }

    fn log(&self, level: LogLevel, message: &str) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }
        let phase = self
            .phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let elapsed_ms = self.start.elapsed().as_millis();

        if settings.json {
            let entry = LogEntry {
                timestamp: Utc::now().to_rfc3339(),
                level,
                test: &self.test_name,
                phase: &phase,
                message,
                elapsed_ms,
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{line}");
            }
        } else {
            eprintln!(
                "[{level:?}] {} ({phase}, {elapsed_ms}ms): {message}",
                self.test_name
            );
        }
    }
}
