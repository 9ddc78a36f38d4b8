use flymigrate::config::{MapEnv, Settings, ENV_APP_NAME, ENV_DATABASE_URL};

pub const APP: &str = "myapp-db";
pub const DATABASE_URL: &str = "postgres://u:p@localhost:5432/db";
pub const READY_LINE: &str = "Proxying local port 5432 for myapp-db.internal:5432";

/// Builder for `Settings` to simplify test setup.
///
/// Starts from defaults with neither required value set; `complete()` fills
/// both through an injected environment.
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
        }
    }

    /// Both required values, as in a typical CI environment.
    pub fn complete() -> Self {
        Self::new().with_env(
            MapEnv::new()
                .with(ENV_APP_NAME, APP)
                .with(ENV_DATABASE_URL, DATABASE_URL),
        )
    }

    pub fn with_env(mut self, env: MapEnv) -> Self {
        self.settings.apply_env(&env);
        self
    }

    pub fn app(mut self, app: Option<&str>) -> Self {
        self.settings.guard.app = app.map(str::to_string);
        self
    }

    pub fn database_url(mut self, url: Option<&str>) -> Self {
        self.settings.migrate.database_url = url.map(str::to_string);
        self
    }

    pub fn guard_program(mut self, program: &str, args: &[&str]) -> Self {
        self.settings.guard.program = program.to_string();
        self.settings.guard.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn migrate_program(mut self, program: &str, args: &[&str]) -> Self {
        self.settings.migrate.program = program.to_string();
        self.settings.migrate.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn ready_timeout(mut self, timeout: &str) -> Self {
        self.settings.guard.ready_timeout = Some(timeout.to_string());
        self
    }

    pub fn shutdown_grace(mut self, grace: &str) -> Self {
        self.settings.guard.shutdown_grace = grace.to_string();
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
