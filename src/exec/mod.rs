// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`lines`] defines `LineSource`, the one-shot line stream the readiness
//!   handshake reads from, plus an in-memory implementation.
//! - [`backend`] defines the `GuardProcess` and `ProcessBackend` traits the
//!   runner talks to, so tests can swap in fakes.
//! - [`command`] is the production `TokioBackend` built on
//!   `tokio::process::Command`.
//! - [`scope`] owns a started guard process and guarantees it is terminated
//!   exactly once on every exit path.

pub mod backend;
pub mod command;
pub mod lines;
pub mod scope;

pub use backend::{BoxFuture, GuardProcess, ProcessBackend};
pub use command::{TokioBackend, TokioGuard};
pub use lines::{stdout_sink, LineSink, LineSource, VecLineSource};
pub use scope::GuardScope;
