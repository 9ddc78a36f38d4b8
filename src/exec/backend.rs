// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The runner talks to a `ProcessBackend` instead of `tokio::process`
//! directly. Production uses [`TokioBackend`](super::TokioBackend); tests
//! provide a backend that records spawns and replays scripted proxy output.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::errors::Result;
use crate::exec::lines::{LineSink, LineSource};
use crate::types::CommandSpec;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A running guard (proxy) process whose stdout is read line by line.
pub trait GuardProcess: LineSource {
    /// OS process id, if the process is still known to be running.
    fn id(&self) -> Option<u32>;

    /// Send the graceful termination signal. Does not wait.
    fn terminate(&mut self) -> Result<()>;

    /// Wait for the process to exit, force-killing it once `grace` elapses,
    /// and release its handles.
    fn close(&mut self, grace: Duration) -> BoxFuture<'_, Result<()>>;

    /// Stop handing out lines. Further output keeps being read in the
    /// background and passed to `echo`, so the process never blocks on a
    /// full pipe. These lines never affect readiness.
    fn detach_output(&mut self, _echo: LineSink) {}
}

/// How guard and dependent processes are started.
pub trait ProcessBackend: Send {
    /// Start the guard process with stdout captured.
    fn spawn_guard(&mut self, spec: &CommandSpec) -> Result<Box<dyn GuardProcess>>;

    /// Run the dependent process to completion and return its exit code
    /// (`-1` when it was killed by a signal).
    fn run_dependent<'a>(&'a mut self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<i32>>;
}
