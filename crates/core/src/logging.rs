//! Logging infrastructure for the conjure CLI.
//!
//! Logs go to stderr; stdout is reserved for data such as dry-run output
//! and template listings.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Filter used when neither the CLI, the config file nor `RUST_LOG` set one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Initialize the tracing subscriber with stderr output.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "debug", "conjure_prompt=trace")
/// * `no_color` - Disable colored output
///
/// # Example
/// ```no_run
/// use conjure_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Resolve the effective filter: explicit level, then `RUST_LOG`, then the default.
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let from_env = std::env::var("RUST_LOG").ok();
    build_filter_from(log_level, from_env.as_deref())
}

fn build_filter_from(log_level: Option<&str>, from_env: Option<&str>) -> AppResult<EnvFilter> {
    let filter_str = log_level.or(from_env).unwrap_or(DEFAULT_LOG_FILTER);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", filter_str, e)))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    use std::io::IsTerminal;

    std::env::var("NO_COLOR").is_err() && std::io::stderr().is_terminal()
}
