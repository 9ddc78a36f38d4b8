// src/exec/command.rs

//! Production process backend on top of `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{FlymigrateError, Result};
use crate::exec::backend::{BoxFuture, GuardProcess, ProcessBackend};
use crate::exec::lines::{LineSink, LineSource};
use crate::types::CommandSpec;

/// How long `close` waits for buffered guard output to be echoed once the
/// process is gone. A grandchild still holding the pipe open is cut off.
const DRAIN_WAIT: Duration = Duration::from_secs(1);

/// Backend that spawns real OS processes.
#[derive(Debug, Clone, Default)]
pub struct TokioBackend;

impl TokioBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessBackend for TokioBackend {
    fn spawn_guard(&mut self, spec: &CommandSpec) -> Result<Box<dyn GuardProcess>> {
        Ok(Box::new(TokioGuard::spawn(spec)?))
    }

    fn run_dependent<'a>(&'a mut self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<i32>> {
        Box::pin(async move {
            info!(program = %spec.program(), cmd = %spec, "starting dependent process");

            let status = Command::new(spec.program())
                .args(spec.arguments())
                .kill_on_drop(true)
                .status()
                .await
                .with_context(|| format!("running '{}'", spec.program()))?;

            let code = status.code().unwrap_or(-1);
            info!(
                program = %spec.program(),
                exit_code = code,
                success = status.success(),
                "dependent process exited"
            );
            Ok(code)
        })
    }
}

/// A guard process spawned with its stdout piped.
///
/// `kill_on_drop(true)` is the last line of defence if the guard is dropped
/// without going through [`GuardProcess::close`].
pub struct TokioGuard {
    child: Child,
    lines: Option<Lines<BufReader<ChildStdout>>>,
    drain: Option<JoinHandle<()>>,
}

impl TokioGuard {
    pub fn spawn(spec: &CommandSpec) -> Result<Self> {
        info!(program = %spec.program(), cmd = %spec, "starting guard process");

        let mut child = Command::new(spec.program())
            .args(spec.arguments())
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FlymigrateError::GuardStartup(format!(
                    "could not start '{}': {e}",
                    spec.program()
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            FlymigrateError::GuardStartup("guard stdout was not captured".to_string())
        })?;

        debug!(pid = ?child.id(), "guard process spawned");

        Ok(Self {
            child,
            lines: Some(BufReader::new(stdout).lines()),
            drain: None,
        })
    }
}

impl LineSource for TokioGuard {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move {
            match self.lines.as_mut() {
                Some(lines) => Ok(lines.next_line().await?),
                None => Ok(None),
            }
        })
    }
}

impl GuardProcess for TokioGuard {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> Result<()> {
        let pid = self.child.id().ok_or_else(|| {
            FlymigrateError::Cleanup("guard process has already exited".to_string())
        })?;
        send_sigterm(&mut self.child, pid)
    }

    fn close(&mut self, grace: Duration) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let exited = tokio::time::timeout(grace, self.child.wait()).await;
            let result = match exited {
                Ok(Ok(status)) => {
                    debug!(status = %status, "guard process exited");
                    Ok(())
                }
                Ok(Err(e)) => Err(FlymigrateError::Cleanup(format!(
                    "waiting for guard process: {e}"
                ))),
                Err(_) => {
                    warn!(
                        grace_ms = grace.as_millis() as u64,
                        "guard process ignored termination signal; killing"
                    );
                    self.child.kill().await.map_err(|e| {
                        FlymigrateError::Cleanup(format!("killing guard process: {e}"))
                    })
                }
            };

            self.lines = None;
            if let Some(mut drain) = self.drain.take() {
                if tokio::time::timeout(DRAIN_WAIT, &mut drain).await.is_err() {
                    debug!("guard stdout still open after exit; dropping the rest");
                    drain.abort();
                }
            }
            result
        })
    }

    fn detach_output(&mut self, echo: LineSink) {
        let Some(mut lines) = self.lines.take() else {
            return;
        };
        self.drain = Some(tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                (*echo)(&line);
            }
            debug!("guard stdout drain ended");
        }));
    }
}

#[cfg(unix)]
fn send_sigterm(_child: &mut Child, pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| FlymigrateError::Cleanup(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM)
        .map_err(|e| FlymigrateError::Cleanup(format!("sending SIGTERM to pid {pid}: {e}")))
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child, _pid: u32) -> Result<()> {
    child
        .start_kill()
        .map_err(|e| FlymigrateError::Cleanup(format!("terminating guard process: {e}")))
}
