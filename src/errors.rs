// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlymigrateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Guard startup failed: {0}")]
    GuardStartup(String),

    #[error("Dependent process exited with code {0}")]
    DependentProcess(i32),

    #[error("Guard cleanup failed: {0}")]
    Cleanup(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlymigrateError {
    /// Process exit code for this error.
    ///
    /// A failing dependent process passes its own code through when it fits
    /// in a process exit status; everything else is `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlymigrateError::DependentProcess(code) if (1..=255).contains(code) => *code,
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlymigrateError>;
