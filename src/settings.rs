//! Process configuration, loaded once at startup from an optional file and
//! the environment (`TIMELINE_*`), in that order of increasing precedence.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_address: String,
    pub mongo_uri: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads `config/timeline.toml` if present, then layers environment
    /// overrides (`TIMELINE__BIND_ADDRESS`, `TIMELINE__MONGO_URI`, ...) on
    /// top of the built-in defaults.
    pub fn load() -> Result<Settings, ConfigError> {
        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("mongo_uri", defaults.mongo_uri)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::with_name("config/timeline").required(false))
            .add_source(Environment::with_prefix("timeline").separator("__"));

        builder.build()?.try_deserialize()
    }
}
