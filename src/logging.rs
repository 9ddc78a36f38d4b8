// src/logging.rs

//! Logging setup for `flymigrate` using `tracing` + `tracing-subscriber`.
//!
//! Two output channels, kept apart:
//! - STDOUT: proxy output lines, echoed unchanged and never through
//!   `tracing` (see `exec::stdout_sink`), followed by the migration tool's
//!   own inherited output.
//! - STDERR: flymigrate's lifecycle logs (spawns, readiness, state
//!   transitions, cleanup warnings).
//!
//! Filter selection, first match wins:
//! 1. `--log-level <LEVEL>`
//! 2. `FLYMIGRATE_LOG`, any `EnvFilter` directive list
//!    (e.g. `"debug"` or `"flymigrate=debug,warn"`)
//! 3. `info`

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "FLYMIGRATE_LOG";

/// Initialise global logging subscriber.
///
/// Fails if `FLYMIGRATE_LOG` holds an unparsable directive. Call once.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env_value.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid {LOG_ENV} value {directives:?}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn filter_directives(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "info".to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
