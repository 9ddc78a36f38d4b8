// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::env::{ENV_APP_NAME, ENV_DATABASE_URL};
use crate::config::model::{RunPlan, Settings};
use crate::errors::{FlymigrateError, Result};
use crate::types::CommandSpec;

impl TryFrom<Settings> for RunPlan {
    type Error = FlymigrateError;

    fn try_from(settings: Settings) -> std::result::Result<Self, Self::Error> {
        let app = required(settings.guard.app.as_deref(), ENV_APP_NAME, "[guard].app")?;
        let database_url = required(
            settings.migrate.database_url.as_deref(),
            ENV_DATABASE_URL,
            "[migrate].database_url",
        )?;

        ensure_program(&settings.guard.program, "[guard].program")?;
        ensure_program(&settings.migrate.program, "[migrate].program")?;

        if settings.guard.port == 0 {
            return Err(FlymigrateError::ConfigError(
                "[guard].port must be >= 1 (got 0)".to_string(),
            ));
        }

        let ready_timeout = settings
            .guard
            .ready_timeout
            .as_deref()
            .map(|s| duration_field(s, "[guard].ready_timeout"))
            .transpose()?;
        let shutdown_grace =
            duration_field(&settings.guard.shutdown_grace, "[guard].shutdown_grace")?;

        let port = settings.guard.port.to_string();
        let ready_prefix = settings
            .guard
            .ready_prefix
            .clone()
            .unwrap_or_else(|| format!("Proxying local port {port}"));
        if ready_prefix.is_empty() {
            return Err(FlymigrateError::ConfigError(
                "[guard].ready_prefix must not be empty".to_string(),
            ));
        }

        let guard = CommandSpec::new(settings.guard.program.trim())
            .args(settings.guard.args.iter().cloned())
            .arg(port)
            .arg("-a")
            .arg(app);

        let mut dependent = CommandSpec::new(settings.migrate.program.trim())
            .args(settings.migrate.args.iter().cloned())
            .arg("--database-url")
            .secret_arg(database_url);
        if let Some(source) = settings.migrate.source.as_deref() {
            dependent = dependent.arg("--source").arg(source);
        }

        Ok(RunPlan {
            guard,
            ready_prefix,
            ready_timeout,
            shutdown_grace,
            dependent,
        })
    }
}

fn required<'a>(value: Option<&'a str>, env_var: &str, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FlymigrateError::ConfigError(format!(
            "{env_var} is not set (or set {field} in the config file)"
        ))),
    }
}

fn ensure_program(program: &str, field: &str) -> Result<()> {
    if program.trim().is_empty() {
        return Err(FlymigrateError::ConfigError(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn duration_field(value: &str, field: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| FlymigrateError::ConfigError(format!("{field}: {e}")))
}
