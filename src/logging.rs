//! # Structured Logging Module
//!
//! Environment-aware structured logging for call lifecycles. Console output
//! by default, JSON lines when `GRPC_WEB_LOG_FORMAT=json`.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once, and tolerant of a subscriber installed by
/// the host application.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("GRPC_WEB_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| get_log_level(&environment).to_string());
        let json = std::env::var("GRPC_WEB_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            filter = %filter,
            json = json,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("GRPC_WEB_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Log structured data for a finished call
pub fn log_call_operation(
    call_id: Uuid,
    method: &str,
    outcome: &str,
    code: Option<i32>,
    messages: usize,
    details: Option<&str>,
) {
    tracing::info!(
        call_id = %call_id,
        method = %method,
        outcome = %outcome,
        code = code,
        messages = messages,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "CALL_OPERATION"
    );
}
