// src/exec/lines.rs

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, Lines};

use crate::errors::Result;
use crate::exec::backend::BoxFuture;

/// A lazy, finite, non-restartable sequence of text lines.
///
/// `Ok(None)` marks end of stream; after that every call keeps returning
/// `Ok(None)`.
pub trait LineSource: Send {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>>;
}

impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move { Ok(Lines::next_line(self).await?) })
    }
}

/// Where guard output lines are echoed, unchanged.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Echo lines to stdout. Write errors (closed pipe) are ignored.
pub fn stdout_sink() -> LineSink {
    Arc::new(|line: &str| {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}").and_then(|()| out.flush());
    })
}

/// In-memory line source, mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct VecLineSource {
    lines: VecDeque<String>,
    consumed: usize,
}

impl VecLineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            consumed: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of lines handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }

    /// Hand out every remaining line at once.
    pub fn drain_all(&mut self) -> Vec<String> {
        self.consumed += self.lines.len();
        self.lines.drain(..).collect()
    }
}

impl LineSource for VecLineSource {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        let line = self.lines.pop_front();
        if line.is_some() {
            self.consumed += 1;
        }
        Box::pin(async move { Ok(line) })
    }
}
