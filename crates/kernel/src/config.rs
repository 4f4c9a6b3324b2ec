//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, the in-memory storage is used.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Path to plugins directory (default: ./plugins).
    pub plugins_dir: PathBuf,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Plugin names to force-disable on first install (from DISABLED_PLUGINS env var).
    pub disabled_plugins: Vec<String>,

    /// Reject dependency cycles when computing the plugin load order
    /// instead of logging them (default: false).
    pub strict_plugin_dependencies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            database_max_connections: 10,
            plugins_dir: PathBuf::from("./plugins"),
            cors_allowed_origins: vec!["*".to_string()],
            disabled_plugins: Vec::new(),
            strict_plugin_dependencies: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let plugins_dir = env::var("PLUGINS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./plugins"));

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let disabled_plugins = env::var("DISABLED_PLUGINS")
            .map(|v| parse_name_list(&v))
            .unwrap_or_default();

        let strict_plugin_dependencies = env::var("PLUGIN_STRICT_DEPENDENCIES")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            plugins_dir,
            cors_allowed_origins,
            disabled_plugins,
            strict_plugin_dependencies,
        })
    }
}

fn parse_name_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_list_skips_blanks() {
        assert_eq!(
            parse_name_list(" excerpt, ,reading_time,"),
            vec!["excerpt".to_string(), "reading_time".to_string()]
        );
    }

    #[test]
    fn bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" YES "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn defaults_use_memory_storage() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
        assert!(!config.strict_plugin_dependencies);
    }
}
