//! Logging setup for Squad.
//!
//! Logging is off unless asked for through the environment:
//!
//! - `SQUAD_DEBUG=true|1|yes` enables debug logging
//! - `SQUAD_LOG_LEVEL=trace|debug|info|warn|error` sets the level
//! - `SQUAD_LOG_FORMAT=json|pretty|compact` picks the output format (default: json)
//!
//! ```rust,no_run
//! use squad_query::logging;
//!
//! // Call once at startup.
//! logging::init();
//! ```
//!
//! Library code logs through the `tracing` macros; generated SQL is logged
//! at debug level with an `sql` field.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Whether `SQUAD_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SQUAD_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level from `SQUAD_LOG_LEVEL`, or "debug"/"warn" depending on
/// `SQUAD_DEBUG`.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("SQUAD_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The format from `SQUAD_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("SQUAD_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Without the `tracing-subscriber` feature this only records that
/// initialisation happened; callers may install their own subscriber.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("SQUAD_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "squad={},squad_query={},squad_sqlite={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: another subscriber may already be installed.
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = get_log_format(), "Squad logging initialized");
            }
        }
    });
}

/// Debug log only when `SQUAD_DEBUG` is enabled.
#[macro_export]
macro_rules! squad_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // SAFETY: no other test in this crate touches these variables.
        unsafe {
            env::remove_var("SQUAD_DEBUG");
            env::remove_var("SQUAD_LOG_LEVEL");
            env::remove_var("SQUAD_LOG_FORMAT");
        }
        assert!(!is_debug_enabled());
        assert_eq!(get_log_level(), "warn");
        assert_eq!(get_log_format(), "json");
    }
}
