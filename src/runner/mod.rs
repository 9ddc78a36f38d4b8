// src/runner/mod.rs

//! Guarded dependent-process runner.
//!
//! Starts the guard (proxy) process, waits for its readiness line, runs the
//! dependent (migration) process, and terminates the guard on every exit
//! path once it has been spawned.
//!
//! ```text
//! Unconfigured -> GuardStarting -> GuardReady -> DependentRunning -> Cleanup -> Done
//!      |               |                              |                |
//!      +---------------+------------------------------+--> (Cleanup) --+--> Failed
//! ```

pub mod readiness;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{RunPlan, Settings};
use crate::errors::{FlymigrateError, Result};
use crate::exec::{stdout_sink, GuardScope, LineSink, ProcessBackend};

pub use readiness::{await_readiness, await_readiness_within};

/// Lifecycle position of a run, used for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unconfigured,
    GuardStarting,
    GuardReady,
    DependentRunning,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Unconfigured => "unconfigured",
            RunState::GuardStarting => "guard-starting",
            RunState::GuardReady => "guard-ready",
            RunState::DependentRunning => "dependent-running",
            RunState::Cleanup => "cleanup",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The guard output line that signalled readiness.
    pub ready_line: String,
    /// Exit code of the dependent process (always `0` here; non-zero codes
    /// surface as `FlymigrateError::DependentProcess`).
    pub exit_code: i32,
}

pub struct GuardedRunner<B: ProcessBackend> {
    backend: B,
    echo: LineSink,
    state: RunState,
    history: Vec<RunState>,
}

impl<B: ProcessBackend> GuardedRunner<B> {
    /// Runner that echoes guard output to stdout.
    pub fn new(backend: B) -> Self {
        Self::with_echo(backend, stdout_sink())
    }

    /// Runner that passes every guard output line to `echo` instead.
    pub fn with_echo(backend: B, echo: LineSink) -> Self {
        Self {
            backend,
            echo,
            state: RunState::Unconfigured,
            history: vec![RunState::Unconfigured],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Validate `settings`, then run both stages.
    ///
    /// Invalid settings fail with `ConfigError` before any process exists.
    pub async fn run(&mut self, settings: Settings) -> Result<RunReport> {
        let plan = match RunPlan::try_from(settings) {
            Ok(plan) => plan,
            Err(err) => {
                self.transition(RunState::Failed);
                return Err(err);
            }
        };
        self.run_plan(&plan).await
    }

    /// Run both stages of an already validated plan.
    pub async fn run_plan(&mut self, plan: &RunPlan) -> Result<RunReport> {
        let result = self.run_stages(plan).await;
        match &result {
            Ok(report) => {
                self.transition(RunState::Done);
                info!(exit_code = report.exit_code, "run finished");
            }
            Err(err) => {
                self.transition(RunState::Failed);
                debug!(error = %err, "run failed");
            }
        }
        result
    }

    async fn run_stages(&mut self, plan: &RunPlan) -> Result<RunReport> {
        self.transition(RunState::GuardStarting);
        let process = self.backend.spawn_guard(&plan.guard)?;
        let mut scope = GuardScope::new(process, plan.shutdown_grace);

        let echo = Arc::clone(&self.echo);
        let ready = await_readiness_within(
            scope.process(),
            &plan.ready_prefix,
            plan.ready_timeout,
            move |line: &str| (*echo)(line),
        )
        .await;
        let ready_line = match ready {
            Ok(line) => line,
            Err(err) => {
                self.cleanup(scope).await;
                return Err(err);
            }
        };

        self.transition(RunState::GuardReady);
        info!(pid = ?scope.process().id(), "guard ready");
        scope.process().detach_output(Arc::clone(&self.echo));

        self.transition(RunState::DependentRunning);
        let outcome = self.backend.run_dependent(&plan.dependent).await;
        self.cleanup(scope).await;

        let exit_code = outcome?;
        if exit_code != 0 {
            return Err(FlymigrateError::DependentProcess(exit_code));
        }

        Ok(RunReport {
            ready_line,
            exit_code,
        })
    }

    /// Release the guard. Failures are logged and never replace the
    /// primary result.
    async fn cleanup(&mut self, scope: GuardScope) {
        self.transition(RunState::Cleanup);
        if let Err(err) = scope.release().await {
            warn!(error = %err, "guard cleanup failed");
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "state");
        self.state = next;
        self.history.push(next);
    }
}
