//! Structured logging for the SHURIUM consensus core.
//!
//! Same shape as the teacher's `logging.rs`: JSON output for aggregation in
//! production, pretty output for development, a small `LogEvent` builder,
//! and category-specific helper functions so call sites don't hand-build
//! `serde_json::json!` blobs inline.

use serde::Serialize;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::Network;

/// Application log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Event categories for structured logging.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Block/difficulty/subsidy consensus events.
    Consensus,
    /// PoUW commitment extraction/validation.
    Pouw,
    /// Useful-work solution verification.
    Verification,
    /// UBI pool/claim events.
    Ubi,
    /// System events (startup, shutdown).
    System,
}

/// A structured log event, serialized to JSON before being handed to
/// `tracing` (so aggregators get one parseable blob per line regardless of
/// the configured `tracing-subscriber` formatter).
#[derive(Debug, Serialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub category: EventCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LogEvent {
    pub fn new(category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            category,
            message: message.into(),
            data: None,
            duration_ms: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"message\": \"{}\"}}", self.message))
    }
}

/// Log a PoUW commitment validation outcome.
pub fn log_pouw_event(block_height: u64, valid: bool, reason: &str) {
    let event = LogEvent::new(EventCategory::Pouw, "commitment validation").with_data(
        serde_json::json!({ "height": block_height, "valid": valid, "reason": reason }),
    );
    if valid {
        tracing::info!(target: "shurium::pouw", "{}", event.to_json());
    } else {
        tracing::warn!(target: "shurium::pouw", "{}", event.to_json());
    }
}

/// Log a useful-work solution verification outcome.
pub fn log_verification_event(problem_id: &str, result: &str, score: u32, elapsed_ms: u64) {
    let event = LogEvent::new(EventCategory::Verification, "solution verified")
        .with_data(serde_json::json!({ "problem_id": problem_id, "result": result, "score": score }))
        .with_duration(elapsed_ms);
    tracing::info!(target: "shurium::verify", "{}", event.to_json());
}

/// Log a UBI claim processing outcome.
pub fn log_claim_event(epoch: u64, status: &str, amount_sats: i64) {
    let event = LogEvent::new(EventCategory::Ubi, "claim processed").with_data(serde_json::json!({
        "epoch": epoch,
        "status": status,
        "amount_sats": amount_sats,
    }));
    if status == "Valid" {
        tracing::info!(target: "shurium::ubi", "{}", event.to_json());
    } else {
        tracing::debug!(target: "shurium::ubi", "{}", event.to_json());
    }
}

/// Logging initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Initialize the logging system.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let level_str = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shurium={}", level_str)));

    if json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        );
        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        );
        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging appropriate for the given network (JSON on mainnet,
/// pretty-printed elsewhere — same convention as the teacher's
/// `init_from_config`).
pub fn init_for_network(network: Network, level: LogLevel) -> Result<(), LoggingError> {
    init_logging(level, network == Network::Mainnet)
}
