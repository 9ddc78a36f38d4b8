// src/config/env.rs

use std::collections::HashMap;
use std::fmt::Debug;

/// Environment variable holding the Fly app name of the Postgres cluster.
pub const ENV_APP_NAME: &str = "POSTGRES_APP_NAME";

/// Environment variable holding the connection string handed to sqlx.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Abstract read access to environment variables.
pub trait EnvSource: Send + Sync + Debug {
    fn var(&self, key: &str) -> Option<String>;
}

/// Implementation that reads the real process environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory environment.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
