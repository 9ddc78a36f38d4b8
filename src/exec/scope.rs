// src/exec/scope.rs

use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::exec::backend::GuardProcess;

/// Exclusive owner of a started guard process.
///
/// The process is terminated exactly once: by [`GuardScope::release`] on the
/// normal path, or by `Drop` if the scope is abandoned (panic, or the
/// enclosing future being cancelled). Nothing else may signal the process.
///
/// The `Drop` path cannot wait, so it is not graceful: the termination
/// signal is sent, and a backend that kills on drop (as `TokioGuard` does)
/// force-kills the process right after.
pub struct GuardScope {
    process: Box<dyn GuardProcess>,
    grace: Duration,
    terminated: bool,
}

impl GuardScope {
    pub fn new(process: Box<dyn GuardProcess>, grace: Duration) -> Self {
        Self {
            process,
            grace,
            terminated: false,
        }
    }

    pub fn process(&mut self) -> &mut dyn GuardProcess {
        self.process.as_mut()
    }

    /// Terminate the guard, then wait for it and release its handles.
    ///
    /// A termination failure (typically: the process already exited) does
    /// not skip the close step. The first error is returned.
    pub async fn release(mut self) -> Result<()> {
        self.terminated = true;
        debug!(pid = ?self.process.id(), "terminating guard process");

        let terminate = self.process.terminate();
        let close = self.process.close(self.grace).await;

        terminate.and(close)
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        warn!(
            pid = ?self.process.id(),
            "guard scope dropped without release; stopping guard without grace period"
        );
        if let Err(e) = self.process.terminate() {
            warn!(error = %e, "failed to terminate guard process on drop");
        }
    }
}
