// tests/guarded_runner.rs

use std::error::Error;

use flymigrate::config::{MapEnv, ENV_APP_NAME, ENV_DATABASE_URL};
use flymigrate::errors::FlymigrateError;
use flymigrate::runner::{GuardedRunner, RunState};
use flymigrate_test_utils::builders::{SettingsBuilder, APP, DATABASE_URL, READY_LINE};
use flymigrate_test_utils::fake_backend::{Event, FakeBackend};
use flymigrate_test_utils::{init_tracing, with_timeout, CapturedLines};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn missing_or_empty_config_spawns_nothing() {
    init_tracing();

    let cases = [
        ("no app", SettingsBuilder::new().database_url(Some(DATABASE_URL))),
        ("no url", SettingsBuilder::new().app(Some(APP))),
        ("neither", SettingsBuilder::new()),
        (
            "empty app",
            SettingsBuilder::new()
                .app(Some(""))
                .database_url(Some(DATABASE_URL)),
        ),
        (
            "blank url",
            SettingsBuilder::new()
                .app(Some(APP))
                .database_url(Some("  ")),
        ),
        (
            "empty env",
            SettingsBuilder::new().with_env(
                MapEnv::new()
                    .with(ENV_APP_NAME, "")
                    .with(ENV_DATABASE_URL, ""),
            ),
        ),
    ];

    for (name, builder) in cases {
        let backend = FakeBackend::new().guard_lines(&[READY_LINE]);
        let calls = backend.calls();
        let mut runner = GuardedRunner::new(backend);

        let result = runner.run(builder.build()).await;

        assert!(
            matches!(result, Err(FlymigrateError::ConfigError(_))),
            "{name}: expected ConfigError, got {result:?}"
        );
        assert_eq!(calls.spawns(), 0, "{name}: nothing may be spawned");
        assert_eq!(
            runner.history(),
            [RunState::Unconfigured, RunState::Failed],
            "{name}"
        );
    }
}

#[tokio::test]
async fn end_to_end_success_terminates_guard_once() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&[READY_LINE]).dependent_exit(0);
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let settings = SettingsBuilder::new()
        .with_env(
            MapEnv::new()
                .with(ENV_APP_NAME, "myapp-db")
                .with(ENV_DATABASE_URL, "postgres://u:p@localhost:5432/db"),
        )
        .build();

    let report = with_timeout(runner.run(settings)).await?;

    assert_eq!(report.ready_line, READY_LINE);
    assert_eq!(report.exit_code, 0);
    assert_eq!(runner.state(), RunState::Done);

    let guards = calls.guard_specs();
    assert_eq!(guards.len(), 1);
    assert_eq!(guards[0].program(), "flyctl");
    assert_eq!(guards[0].arguments(), ["proxy", "5432", "-a", "myapp-db"]);

    let dependents = calls.dependent_specs();
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].program(), "sqlx");
    assert_eq!(
        dependents[0].arguments(),
        [
            "migrate",
            "run",
            "--database-url",
            "postgres://u:p@localhost:5432/db"
        ]
    );

    assert_eq!(calls.count(Event::Terminate), 1);
    assert_eq!(
        calls.events(),
        vec![
            Event::SpawnGuard,
            Event::Detach,
            Event::RunDependent,
            Event::Terminate,
            Event::Close,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn exact_prefix_line_is_ready() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&["Proxying local port 5432"]);
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    with_timeout(runner.run(SettingsBuilder::complete().build())).await?;

    assert_eq!(calls.count(Event::RunDependent), 1);
    assert_eq!(
        calls.dependent_specs()[0].arguments().last().map(String::as_str),
        Some(DATABASE_URL)
    );

    Ok(())
}

#[tokio::test]
async fn wrong_first_line_fails_and_terminates_guard() {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&["Error: could not resolve app", READY_LINE]);
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    assert!(matches!(result, Err(FlymigrateError::GuardStartup(_))));
    assert_eq!(calls.count(Event::RunDependent), 0);
    assert_eq!(calls.count(Event::Terminate), 1);
    assert_eq!(calls.count(Event::Close), 1);
    assert_eq!(
        runner.history(),
        [
            RunState::Unconfigured,
            RunState::GuardStarting,
            RunState::Cleanup,
            RunState::Failed,
        ]
    );
}

#[tokio::test]
async fn silent_guard_exit_fails() {
    init_tracing();

    let backend = FakeBackend::new();
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    match result {
        Err(FlymigrateError::GuardStartup(msg)) => {
            assert!(msg.contains("without signaling readiness"))
        }
        other => panic!("expected GuardStartup, got {other:?}"),
    }
    assert_eq!(calls.count(Event::RunDependent), 0);
    assert_eq!(calls.count(Event::Terminate), 1);
}

#[tokio::test]
async fn readiness_timeout_fails_and_terminates_guard() {
    init_tracing();

    let backend = FakeBackend::new().silent_guard();
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);
    let settings = SettingsBuilder::complete().ready_timeout("50ms").build();

    let result = with_timeout(runner.run(settings)).await;

    assert!(matches!(result, Err(FlymigrateError::GuardStartup(_))));
    assert_eq!(calls.count(Event::RunDependent), 0);
    assert_eq!(calls.count(Event::Terminate), 1);
}

#[tokio::test]
async fn guard_spawn_failure_needs_no_cleanup() {
    init_tracing();

    let backend = FakeBackend::new().failing_guard_spawn();
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    assert!(matches!(result, Err(FlymigrateError::GuardStartup(_))));
    assert_eq!(calls.count(Event::RunDependent), 0);
    assert_eq!(calls.count(Event::Terminate), 0);
}

#[tokio::test]
async fn dependent_failure_surfaces_exit_code_after_cleanup() {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&[READY_LINE]).dependent_exit(1);
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    match result {
        Err(FlymigrateError::DependentProcess(code)) => assert_eq!(code, 1),
        other => panic!("expected DependentProcess(1), got {other:?}"),
    }
    assert_eq!(calls.count(Event::RunDependent), 1);
    assert_eq!(calls.count(Event::Terminate), 1);
    assert_eq!(runner.state(), RunState::Failed);
}

#[tokio::test]
async fn termination_happens_exactly_once_for_any_exit_code() {
    init_tracing();

    for code in [0, 1, 2, 101] {
        let backend = FakeBackend::new().guard_lines(&[READY_LINE]).dependent_exit(code);
        let calls = backend.calls();
        let mut runner = GuardedRunner::new(backend);

        let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

        assert_eq!(result.is_ok(), code == 0, "exit code {code}");
        assert_eq!(calls.count(Event::Terminate), 1, "exit code {code}");
    }
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_success() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new()
        .guard_lines(&[READY_LINE])
        .failing_terminate();
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let report = with_timeout(runner.run(SettingsBuilder::complete().build())).await?;

    assert_eq!(report.exit_code, 0);
    assert_eq!(calls.count(Event::Terminate), 1);
    assert_eq!(calls.count(Event::Close), 1);

    Ok(())
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_dependent_failure() {
    init_tracing();

    let backend = FakeBackend::new()
        .guard_lines(&[READY_LINE])
        .failing_terminate()
        .dependent_exit(3);
    let mut runner = GuardedRunner::new(backend);

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    assert!(matches!(result, Err(FlymigrateError::DependentProcess(3))));
}

#[tokio::test]
async fn abandoned_run_still_terminates_guard() {
    init_tracing();

    let backend = FakeBackend::new().silent_guard();
    let calls = backend.calls();
    let mut runner = GuardedRunner::new(backend);

    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        runner.run(SettingsBuilder::complete().build()),
    )
    .await;

    assert!(outcome.is_err(), "run should still be waiting for readiness");
    assert_eq!(calls.count(Event::Terminate), 1);
    assert_eq!(calls.count(Event::RunDependent), 0);
}

#[tokio::test]
async fn output_after_readiness_is_echoed_but_not_consulted() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&[
        READY_LINE,
        "Error: connection lost",
        "Proxying local port 5432 again",
    ]);
    let captured = CapturedLines::new();
    let mut runner = GuardedRunner::with_echo(backend, captured.sink());

    let report = with_timeout(runner.run(SettingsBuilder::complete().build())).await?;

    assert_eq!(report.ready_line, READY_LINE);
    assert_eq!(
        captured.lines(),
        vec![
            READY_LINE.to_string(),
            "Error: connection lost".to_string(),
            "Proxying local port 5432 again".to_string(),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn failed_readiness_echoes_only_the_first_line() {
    init_tracing();

    let backend = FakeBackend::new().guard_lines(&["Error: could not resolve app", READY_LINE]);
    let captured = CapturedLines::new();
    let mut runner = GuardedRunner::with_echo(backend, captured.sink());

    let result = with_timeout(runner.run(SettingsBuilder::complete().build())).await;

    assert!(matches!(result, Err(FlymigrateError::GuardStartup(_))));
    assert_eq!(captured.lines(), vec!["Error: could not resolve app".to_string()]);
}
