pub mod builders;
pub mod fake_backend;

use std::future::Future;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use flymigrate::exec::LineSink;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Capture runner logs per test; shown only for failing tests unless run
/// with `--nocapture`. `RUST_LOG=flymigrate=debug` shows state transitions.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Upper bound for one run. Real-process tests include a proxy shutdown
/// grace period and the post-exit output drain, so keep this well above
/// both.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("run did not finish within 5 seconds")
}

/// Echo sink that records guard output lines instead of printing them.
#[derive(Debug, Clone, Default)]
pub struct CapturedLines {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> LineSink {
        let lines = Arc::clone(&self.lines);
        Arc::new(move |line: &str| lines.lock().unwrap().push(line.to_string()))
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}
