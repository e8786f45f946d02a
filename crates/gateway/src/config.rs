use common::{Environment, LogLevel};
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub log_level: LogLevel,
    pub host: String,
    pub port: u16,
    /// Comma-separated origins, or `*`
    pub allowed_origins: String,
    pub top_k: usize,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read the gateway configuration from the process environment.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    load(config::Environment::default())
}

/// Configuration from an explicit variable map instead of the process
/// environment.
pub fn from_vars(vars: HashMap<String, String>) -> Result<Config, config::ConfigError> {
    load(config::Environment::default().source(Some(vars)))
}

fn load(source: config::Environment) -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("environment", "development")?
        .set_default("log_level", "info")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8000)?
        .set_default("allowed_origins", DEFAULT_ALLOWED_ORIGINS)?
        .set_default("top_k", 5)?
        .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as u64)?
        .add_source(source.try_parsing(true))
        .build()?;

    config.try_deserialize::<Config>()
}
