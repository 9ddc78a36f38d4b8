// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use flymigrate::config::{
    default_config_path, load_settings, resolve_settings, MapEnv, RunPlan, ENV_APP_NAME,
    ENV_DATABASE_URL,
};
use flymigrate::errors::FlymigrateError;

#[test]
fn file_values_and_env_overlay_build_a_plan() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[guard]
port = 15432
app = "from-file"
ready_timeout = "30s"
shutdown_grace = "2s"

[migrate]
source = "db/migrations"
"#
    )
    .unwrap();

    let env = MapEnv::new().with(ENV_DATABASE_URL, "postgres://u:p@localhost:15432/db");
    let settings = load_settings(Some(file.path()), &env).unwrap();
    let plan = RunPlan::try_from(settings).unwrap();

    assert_eq!(plan.guard.arguments(), ["proxy", "15432", "-a", "from-file"]);
    assert_eq!(plan.ready_prefix, "Proxying local port 15432");
    assert_eq!(plan.ready_timeout, Some(Duration::from_secs(30)));
    assert_eq!(plan.shutdown_grace, Duration::from_secs(2));
    assert_eq!(
        plan.dependent.to_string(),
        "sqlx migrate run --database-url *** --source db/migrations"
    );
}

#[test]
fn env_alone_is_enough() {
    let env = MapEnv::new()
        .with(ENV_APP_NAME, "myapp-db")
        .with(ENV_DATABASE_URL, "postgres://u:p@localhost:5432/db");
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "").unwrap();

    let settings = load_settings(Some(file.path()), &env).unwrap();

    assert!(RunPlan::try_from(settings).is_ok());
}

#[test]
fn explicit_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Flymigrate.toml");

    match load_settings(Some(missing.as_path()), &MapEnv::new()) {
        Err(FlymigrateError::ConfigError(msg)) => assert!(msg.contains("reading config file")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[guard\nport = 1").unwrap();

    assert!(matches!(
        load_settings(Some(file.path()), &MapEnv::new()),
        Err(FlymigrateError::TomlError(_))
    ));
}

#[test]
fn missing_default_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let default = dir.path().join(default_config_path());
    let env = MapEnv::new()
        .with(ENV_APP_NAME, "myapp-db")
        .with(ENV_DATABASE_URL, "postgres://u:p@localhost:5432/db");

    let settings = resolve_settings(None, &default, &env).unwrap();

    assert_eq!(settings.guard.program, "flyctl");
    assert_eq!(settings.guard.port, 5432);
    assert_eq!(settings.guard.app.as_deref(), Some("myapp-db"));
}

#[test]
fn existing_default_file_is_loaded_when_no_path_given() {
    let dir = tempfile::tempdir().unwrap();
    let default = dir.path().join(default_config_path());
    std::fs::write(&default, "[guard]\napp = \"from-default\"\nport = 6543\n").unwrap();
    let env = MapEnv::new().with(ENV_DATABASE_URL, "postgres://u:p@localhost:6543/db");

    let settings = resolve_settings(None, &default, &env).unwrap();
    let plan = RunPlan::try_from(settings).unwrap();

    assert_eq!(plan.guard.arguments(), ["proxy", "6543", "-a", "from-default"]);
}

#[test]
fn explicit_path_wins_over_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let default = dir.path().join(default_config_path());
    std::fs::write(&default, "[guard]\napp = \"from-default\"\n").unwrap();
    let explicit = dir.path().join("other.toml");
    std::fs::write(&explicit, "[guard]\napp = \"from-explicit\"\n").unwrap();

    let settings = resolve_settings(Some(explicit.as_path()), &default, &MapEnv::new()).unwrap();

    assert_eq!(settings.guard.app.as_deref(), Some("from-explicit"));
}
