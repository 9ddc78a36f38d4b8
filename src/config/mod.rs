// src/config/mod.rs

//! Configuration loading and validation for flymigrate.
//!
//! Responsibilities:
//! - Define the TOML-backed settings and the validated run plan (`model.rs`).
//! - Abstract the process environment so tests can inject it (`env.rs`).
//! - Load an optional config file and overlay the environment (`loader.rs`).
//! - Turn raw settings into a `RunPlan` or a configuration error
//!   (`validate.rs`).

pub mod duration;
pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::{EnvSource, MapEnv, ProcessEnv, ENV_APP_NAME, ENV_DATABASE_URL};
pub use loader::{default_config_path, load_from_path, load_settings, resolve_settings};
pub use model::{GuardSection, MigrateSection, RunPlan, Settings};
