use std::sync::{Arc, Mutex};
use std::time::Duration;

use flymigrate::errors::{FlymigrateError, Result};
use flymigrate::exec::{
    BoxFuture, GuardProcess, LineSink, LineSource, ProcessBackend, VecLineSource,
};
use flymigrate::types::CommandSpec;

/// Everything the fake backend and its guards were asked to do, in order.
#[derive(Debug, Default)]
pub struct Calls {
    events: Mutex<Vec<Event>>,
    guard_specs: Mutex<Vec<CommandSpec>>,
    dependent_specs: Mutex<Vec<CommandSpec>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SpawnGuard,
    Detach,
    RunDependent,
    Terminate,
    Close,
}

impl Calls {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    /// Number of spawn attempts of any kind.
    pub fn spawns(&self) -> usize {
        self.count(Event::SpawnGuard) + self.count(Event::RunDependent)
    }

    pub fn guard_specs(&self) -> Vec<CommandSpec> {
        self.guard_specs.lock().unwrap().clone()
    }

    pub fn dependent_specs(&self) -> Vec<CommandSpec> {
        self.dependent_specs.lock().unwrap().clone()
    }
}

/// A process backend that never touches the OS.
///
/// - The guard replays scripted stdout lines (or stays silent forever).
///   Lines left after readiness are echoed when output is detached.
/// - The dependent "exits" with a configured code.
/// - Every call is recorded in a shared [`Calls`].
pub struct FakeBackend {
    calls: Arc<Calls>,
    guard_lines: Vec<String>,
    silent_guard: bool,
    fail_guard_spawn: bool,
    fail_terminate: bool,
    dependent_exit: i32,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            guard_lines: Vec::new(),
            silent_guard: false,
            fail_guard_spawn: false,
            fail_terminate: false,
            dependent_exit: 0,
        }
    }

    pub fn guard_lines(mut self, lines: &[&str]) -> Self {
        self.guard_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn silent_guard(mut self) -> Self {
        self.silent_guard = true;
        self
    }

    pub fn failing_guard_spawn(mut self) -> Self {
        self.fail_guard_spawn = true;
        self
    }

    /// `terminate()` reports an error, as if the guard had already died.
    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    pub fn dependent_exit(mut self, code: i32) -> Self {
        self.dependent_exit = code;
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessBackend for FakeBackend {
    fn spawn_guard(&mut self, spec: &CommandSpec) -> Result<Box<dyn GuardProcess>> {
        self.calls.record(Event::SpawnGuard);
        self.calls.guard_specs.lock().unwrap().push(spec.clone());

        if self.fail_guard_spawn {
            return Err(FlymigrateError::GuardStartup(format!(
                "could not start '{}': not found",
                spec.program()
            )));
        }

        Ok(Box::new(FakeGuard {
            lines: VecLineSource::new(self.guard_lines.clone()),
            silent: self.silent_guard,
            fail_terminate: self.fail_terminate,
            running: true,
            calls: Arc::clone(&self.calls),
        }))
    }

    fn run_dependent<'a>(&'a mut self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<i32>> {
        self.calls.record(Event::RunDependent);
        self.calls.dependent_specs.lock().unwrap().push(spec.clone());
        let code = self.dependent_exit;
        Box::pin(async move { Ok(code) })
    }
}

struct FakeGuard {
    lines: VecLineSource,
    silent: bool,
    fail_terminate: bool,
    running: bool,
    calls: Arc<Calls>,
}

impl LineSource for FakeGuard {
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        if self.silent {
            return Box::pin(std::future::pending());
        }
        self.lines.next_line()
    }
}

impl GuardProcess for FakeGuard {
    fn id(&self) -> Option<u32> {
        self.running.then_some(4242)
    }

    fn terminate(&mut self) -> Result<()> {
        self.calls.record(Event::Terminate);
        self.running = false;
        if self.fail_terminate {
            return Err(FlymigrateError::Cleanup(
                "guard process has already exited".to_string(),
            ));
        }
        Ok(())
    }

    fn close(&mut self, _grace: Duration) -> BoxFuture<'_, Result<()>> {
        self.calls.record(Event::Close);
        Box::pin(async { Ok(()) })
    }

    fn detach_output(&mut self, echo: LineSink) {
        self.calls.record(Event::Detach);
        for line in self.lines.drain_all() {
            (*echo)(&line);
        }
    }
}
