// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `flymigrate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flymigrate",
    version,
    about = "Open a Fly.io database proxy, run sqlx migrations through it, then tear it down.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to an optional config file (TOML).
    ///
    /// When omitted, `Flymigrate.toml` in the current directory is used if
    /// it exists. An explicitly given path must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLYMIGRATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and validate configuration, print both commands, but don't
    /// start any process.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
