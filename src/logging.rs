//! # Structured Logging Module
//!
//! Environment-aware structured logging: a human-readable console layer plus
//! a JSON file layer under `log/`.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ConfigManager;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        let file_layer = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let pid = process::id();
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
                let file_appender = tracing_appender::rolling::never(
                    &log_dir,
                    format!("{environment}.{pid}.{timestamp}.log"),
                );
                Some(tracing_appender::non_blocking(file_appender))
            }
            Err(_) => None,
        };

        let (file_writer, guard) = match file_layer {
            Some((writer, guard)) => (Some(writer), Some(guard)),
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_filter(env_filter(&log_level)),
            )
            .with(file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(env_filter(&log_level))
            }));

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            file_output = guard.is_some(),
            "Structured logging initialized"
        );

        // The file writer must outlive the process
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
}

/// RUST_LOG wins over the environment default
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        "test" => "debug,sqlx=warn,testcontainers=info".to_string(),
        _ => "debug,sqlx=info".to_string(),
    }
}

/// Log structured data for repository operations
pub fn log_database_operation(
    operation: &str,
    table: &str,
    record_id: Option<i64>,
    status: &str,
    duration_ms: Option<u64>,
) {
    tracing::info!(
        operation = %operation,
        table = %table,
        record_id = record_id,
        status = %status,
        duration_ms = duration_ms,
        "DATABASE_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("production"), "info");
        assert!(get_log_level("test").starts_with("debug"));
        assert!(get_log_level("development").starts_with("debug"));
        assert!(get_log_level("unknown").starts_with("debug"));
    }

    #[test]
    fn test_level_follows_config_environment() {
        let environment = ConfigManager::detect_environment_with(|name| {
            (name == "STORM_TRACKER_ENV").then(|| "Production".to_string())
        });
        assert_eq!(environment, "production");
        assert_eq!(get_log_level(&environment), "info");
    }

    #[test]
    fn test_database_operation_without_subscriber() {
        log_database_operation("count", "storms", None, "success", Some(1));
    }
}
