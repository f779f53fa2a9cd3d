use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::core::distance::UNIVERSITY_BOOST_KM;

const ENV_PREFIX: &str = "COURSE_SEARCH";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Restricts searches to providers of this cycle when set
    pub recruitment_cycle: Option<i32>,
    #[serde(default = "default_university_boost_km")]
    pub university_boost_km: f64,
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            recruitment_cycle: None,
            university_boost_km: default_university_boost_km(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

fn default_university_boost_km() -> f64 { UNIVERSITY_BOOST_KM }
fn default_per_page() -> u32 { 20 }
fn default_max_per_page() -> u32 { 100 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    // e.g., COURSE_SEARCH__SERVER__PORT -> server.port
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with COURSE_SEARCH__)
    /// 5. DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        with_database_url(settings, std::env::var("DATABASE_URL").ok())?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        with_database_url(settings, std::env::var("DATABASE_URL").ok())?.try_deserialize()
    }

    /// Parse configuration from TOML text, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

/// `DATABASE_URL` wins over every configured database url
fn with_database_url(settings: Config, database_url: Option<String>) -> Result<Config, ConfigError> {
    match database_url {
        Some(url) => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        None => Ok(settings),
    }
}
