// src/runner/readiness.rs

//! One-shot readiness handshake over a line stream.
//!
//! Only the first line is consulted: it either starts with the expected
//! prefix (ready) or it doesn't (startup failure). End of stream before any
//! line is also a startup failure.

use std::time::Duration;

use crate::errors::{FlymigrateError, Result};
use crate::exec::lines::LineSource;

/// Read the first line from `source`, echo it, and check it against `prefix`.
///
/// Returns the ready line on success. Read errors are reported as
/// `GuardStartup`, since the guard never became usable.
pub async fn await_readiness<S, F>(source: &mut S, prefix: &str, mut echo: F) -> Result<String>
where
    S: LineSource + ?Sized,
    F: FnMut(&str) + Send,
{
    let first = source.next_line().await.map_err(|e| {
        FlymigrateError::GuardStartup(format!("reading guard output: {e}"))
    })?;

    match first {
        Some(line) => {
            echo(&line);
            if line.starts_with(prefix) {
                Ok(line)
            } else {
                Err(FlymigrateError::GuardStartup(format!(
                    "unexpected guard output {line:?} (expected a line starting with {prefix:?})"
                )))
            }
        }
        None => Err(FlymigrateError::GuardStartup(
            "guard exited without signaling readiness".to_string(),
        )),
    }
}

/// [`await_readiness`] bounded by an optional timeout.
pub async fn await_readiness_within<S, F>(
    source: &mut S,
    prefix: &str,
    limit: Option<Duration>,
    echo: F,
) -> Result<String>
where
    S: LineSource + ?Sized,
    F: FnMut(&str) + Send,
{
    match limit {
        None => await_readiness(source, prefix, echo).await,
        Some(limit) => tokio::time::timeout(limit, await_readiness(source, prefix, echo))
            .await
            .map_err(|_| {
                FlymigrateError::GuardStartup(format!(
                    "guard did not signal readiness within {}ms",
                    limit.as_millis()
                ))
            })?,
    }
}
