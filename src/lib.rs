// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod runner;
pub mod types;

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_settings, ProcessEnv, RunPlan};
use crate::errors::Result;
use crate::exec::TokioBackend;
use crate::runner::GuardedRunner;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (optional config file + environment, read once)
/// - dry-run printing
/// - the guarded runner with the real process backend
/// - Ctrl-C handling (dropping the run terminates the proxy)
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref().map(Path::new), &ProcessEnv)?;

    if args.dry_run {
        let plan = RunPlan::try_from(settings)?;
        std::io::stdout()
            .lock()
            .write_all(render_dry_run(&plan).as_bytes())?;
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let mut runner = GuardedRunner::new(TokioBackend::new());

    let report = tokio::select! {
        res = runner.run(settings) => res?,
        sig = tokio::signal::ctrl_c() => {
            sig?;
            return Err(anyhow!("interrupted by Ctrl+C").into());
        }
    };

    info!(ready_line = %report.ready_line, "migrations applied");
    Ok(())
}

/// Describe both commands (secrets masked) without running anything.
pub fn render_dry_run(plan: &RunPlan) -> String {
    let mut out = String::new();
    let limit = match plan.ready_timeout {
        Some(limit) => format!("{}ms", limit.as_millis()),
        None => "none".to_string(),
    };

    // Writing into a String cannot fail.
    let _ = writeln!(out, "flymigrate dry-run");
    let _ = writeln!(out, "  guard:       {}", plan.guard);
    let _ = writeln!(
        out,
        "  ready when:  first line starts with {:?}",
        plan.ready_prefix
    );
    let _ = writeln!(out, "  ready limit: {limit}");
    let _ = writeln!(out, "  grace:       {}ms", plan.shutdown_grace.as_millis());
    let _ = writeln!(out, "  dependent:   {}", plan.dependent);
    out
}
