//! Shared logging utilities for consistent tracing across the harness

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events are shown at the requested level; everything else is kept at `warn`
const HARNESS_TARGETS: &[&str] = &["stress", "shared"];

/// Build the filter directive string for the given base level
pub fn filter_directives(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");

    let mut directives = vec!["warn".to_string()];
    directives.extend(HARNESS_TARGETS.iter().map(|target| format!("{target}={base_level}")));
    directives.join(",")
}

/// Install the global subscriber. `log_level` is one of trace, debug, info, warn, error.
///
/// An unparsable level falls back to `info`. A second call is a no-op.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(filter_directives(log_level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(None)));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Wall-clock time of day, millisecond precision
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Emit an event tagged with the logical id of the process it concerns
#[doc(hidden)]
#[macro_export]
macro_rules! process_event {
    ($level:expr, $logical_id:expr, $($arg:tt)*) => {
        tracing::event!(
            $level,
            logical_id = %$logical_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! process_info {
    ($logical_id:expr, $($arg:tt)*) => {
        $crate::process_event!(tracing::Level::INFO, $logical_id, $($arg)*)
    };
}

#[macro_export]
macro_rules! process_warn {
    ($logical_id:expr, $($arg:tt)*) => {
        $crate::process_event!(tracing::Level::WARN, $logical_id, $($arg)*)
    };
}

#[macro_export]
macro_rules! process_error {
    ($logical_id:expr, $($arg:tt)*) => {
        $crate::process_event!(tracing::Level::ERROR, $logical_id, $($arg)*)
    };
}

#[macro_export]
macro_rules! process_debug {
    ($logical_id:expr, $($arg:tt)*) => {
        $crate::process_event!(tracing::Level::DEBUG, $logical_id, $($arg)*)
    };
}

pub fn log_startup(details: &str) {
    info!(timestamp = format_timestamp(), "🚀 Starting {}", details);
}

pub fn log_shutdown(reason: &str) {
    info!(timestamp = format_timestamp(), "🛑 Shutting down: {}", reason);
}

/// Log a failed step together with its error
pub fn log_error(context: &str, error: &dyn std::fmt::Display) {
    error!(
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

pub fn log_success(message: &str) {
    info!(timestamp = format_timestamp(), "✅ {}", message);
}

pub fn log_progress(action: &str, details: &str) {
    info!(timestamp = format_timestamp(), "📋 {}: {}", action, details);
}
