//! Tracing setup
//!
//! One rolling log file (JSON or plain text) plus ANSI stdout in text mode.
//! `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LogConfig;

/// Map the configured rotation; anything unrecognised means a single file
pub fn rotation(name: &str) -> Rotation {
    match name.to_ascii_lowercase().as_str() {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Default directives: the configured level for this crate and its
/// binaries, warnings for everything else
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,bridge_validator={level},check_config={level}"))
}

/// Install the global subscriber. Hold the returned guard for the lifetime
/// of the process or buffered log lines are lost on exit.
pub fn init_logging(config: &LogConfig) -> WorkerGuard {
    let appender =
        RollingFileAppender::new(rotation(&config.rotation), &config.log_dir, &config.log_file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(true)
            .with_writer(writer)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}
