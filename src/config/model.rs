// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::config::env::{EnvSource, ENV_APP_NAME, ENV_DATABASE_URL};
use crate::types::CommandSpec;

/// Raw settings as read from an optional TOML file and the environment.
///
/// ```toml
/// [guard]
/// program = "flyctl"
/// port = 5432
/// app = "myapp-db"
/// ready_timeout = "30s"
///
/// [migrate]
/// program = "sqlx"
/// source = "migrations"
/// ```
///
/// Every field has a default, so an empty file (or no file) is valid TOML.
/// Whether the result is *runnable* is decided by `RunPlan::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub guard: GuardSection,

    #[serde(default)]
    pub migrate: MigrateSection,
}

/// `[guard]` section: the `flyctl proxy` tunnel.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardSection {
    #[serde(default = "default_guard_program")]
    pub program: String,

    /// Arguments placed before the port.
    #[serde(default = "default_guard_args")]
    pub args: Vec<String>,

    /// Local port the proxy listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fly app name of the database. `POSTGRES_APP_NAME` takes precedence.
    #[serde(default)]
    pub app: Option<String>,

    /// Prefix the first proxy output line must start with.
    ///
    /// Defaults to `"Proxying local port <port>"`.
    #[serde(default)]
    pub ready_prefix: Option<String>,

    /// How long to wait for the first proxy output line. Unset means wait
    /// indefinitely.
    #[serde(default)]
    pub ready_timeout: Option<String>,

    /// How long the proxy gets to exit after SIGTERM before it is killed.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: String,
}

fn default_guard_program() -> String {
    "flyctl".to_string()
}

fn default_guard_args() -> Vec<String> {
    vec!["proxy".to_string()]
}

fn default_port() -> u16 {
    5432
}

fn default_shutdown_grace() -> String {
    "5s".to_string()
}

impl Default for GuardSection {
    fn default() -> Self {
        Self {
            program: default_guard_program(),
            args: default_guard_args(),
            port: default_port(),
            app: None,
            ready_prefix: None,
            ready_timeout: None,
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// `[migrate]` section: the `sqlx migrate run` invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateSection {
    #[serde(default = "default_migrate_program")]
    pub program: String,

    /// Arguments placed before `--database-url`.
    #[serde(default = "default_migrate_args")]
    pub args: Vec<String>,

    /// Connection string. `DATABASE_URL` takes precedence.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Migrations directory, passed as `--source`.
    #[serde(default)]
    pub source: Option<String>,
}

fn default_migrate_program() -> String {
    "sqlx".to_string()
}

fn default_migrate_args() -> Vec<String> {
    vec!["migrate".to_string(), "run".to_string()]
}

impl Default for MigrateSection {
    fn default() -> Self {
        Self {
            program: default_migrate_program(),
            args: default_migrate_args(),
            database_url: None,
            source: None,
        }
    }
}

impl Settings {
    /// Overlay the two required values from the environment.
    ///
    /// Unset or blank variables leave the file value in place.
    pub fn apply_env(&mut self, env: &dyn EnvSource) {
        if let Some(app) = non_blank(env.var(ENV_APP_NAME)) {
            self.guard.app = Some(app);
        }
        if let Some(url) = non_blank(env.var(ENV_DATABASE_URL)) {
            self.migrate.database_url = Some(url);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fully resolved, validated description of one run.
///
/// Built by `RunPlan::try_from(Settings)`, which rejects settings missing
/// either required value.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub guard: CommandSpec,
    pub ready_prefix: String,
    pub ready_timeout: Option<Duration>,
    pub shutdown_grace: Duration,
    pub dependent: CommandSpec,
}
