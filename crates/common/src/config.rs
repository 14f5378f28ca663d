//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Listing and tagging limits.
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Site behaviour: page sizes and tag limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Questions per listing page.
    #[serde(default = "default_questions_per_page")]
    pub questions_per_page: u64,
    /// Answers per page on a question's detail view.
    #[serde(default = "default_answers_per_page")]
    pub answers_per_page: u64,
    /// Number of entries in the trending view.
    #[serde(default = "default_trending_limit")]
    pub trending_limit: u64,
    /// Maximum number of tags on a single question.
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            questions_per_page: default_questions_per_page(),
            answers_per_page: default_answers_per_page(),
            trending_limit: default_trending_limit(),
            max_tags: default_max_tags(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_questions_per_page() -> u64 {
    20
}

const fn default_answers_per_page() -> u64 {
    30
}

const fn default_trending_limit() -> u64 {
    20
}

const fn default_max_tags() -> usize {
    3
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `QANDA_ENV`)
    /// 3. Environment variables with `QANDA__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("QANDA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("QANDA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("QANDA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
