//! Handles settings for the application. Configuration is written in
//! `settings.toml` next to the binary (or pointed at by `ROMANA_CONFIG`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Storage backend for the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "path")]
pub enum Database {
    /// In-memory database, lost on shutdown. Useful for trying things out.
    Memory,
    /// SQLite file at the given path.
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level filter applied to every crate of the workspace.
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("ROMANA_CONFIG").unwrap_or_else(|_| "settings".to_string());
        let settings = Config::builder()
            .add_source(File::with_name(&path))
            .add_source(Environment::with_prefix("ROMANA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
