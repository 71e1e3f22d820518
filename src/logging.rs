//! # Structured Logging Module
//!
//! Environment-aware structured logging for the decision service. Console
//! output by default, JSON lines when `DECISION_LOG_FORMAT=json`.

use crate::constants::{AlertSeverity, OperatingMode};
use crate::models::TriggeredRule;
use chrono::Utc;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = use_json_format();

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .boxed()
        };

        // Another subscriber (e.g. a test harness) may already be installed
        if tracing_subscriber::registry()
            .with(console.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("DECISION_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

fn use_json_format() -> bool {
    std::env::var("DECISION_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log an operating mode change
pub fn log_mode_transition(from: OperatingMode, to: OperatingMode, reason: &str) {
    let marker = match to {
        OperatingMode::Normal => "🟢",
        OperatingMode::Degraded => "🟡",
        OperatingMode::Offline => "🔴",
    };
    tracing::warn!(
        from = %from,
        to = %to,
        reason = %reason,
        timestamp = %Utc::now().to_rfc3339(),
        "{marker} MODE_TRANSITION"
    );
}

/// Log structured data for cache operations
pub fn log_cache_operation(
    operation: &str,
    fingerprint: Option<&str>,
    status: &str,
    duration_ms: Option<f64>,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        fingerprint = fingerprint,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 CACHE_OPERATION"
    );
}

/// Log the outcome of an alert evaluation that fired
pub fn log_alert(severity: AlertSeverity, rules: &[TriggeredRule], published: bool) {
    let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
    match severity {
        AlertSeverity::Critical | AlertSeverity::High => tracing::error!(
            severity = %severity,
            rules = ?names,
            published = published,
            timestamp = %Utc::now().to_rfc3339(),
            "🚨 ALERT"
        ),
        AlertSeverity::Warning | AlertSeverity::Info => tracing::warn!(
            severity = %severity,
            rules = ?names,
            published = published,
            timestamp = %Utc::now().to_rfc3339(),
            "⚠️ ALERT"
        ),
    }
}
