//! Configuration loading
//!
//! Settings come from a TOML file with per-field environment overrides
//! (`PLAYMART_WAREHOUSE_*`). The resulting [`Config`] is constructed once at
//! startup and passed by reference into each component; there is no
//! process-global settings state.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Warehouse connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Object-store locations and credential reference for the bulk load
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Object-store prefix holding the event JSON files
    pub log_data: String,
    /// Field-mapping descriptor for the event JSON format
    pub log_jsonpath: String,
    /// Object-store prefix holding the song-catalog JSON files
    pub song_data: String,
    /// IAM role ARN the warehouse assumes to read the source objects
    pub iam_role_arn: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub source: SourceConfig,
}

fn default_port() -> u16 {
    5439
}

fn default_region() -> String {
    "us-west-2".to_string()
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Config::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn parse(content: &str) -> std::result::Result<Config, toml::de::Error> {
        toml::from_str(content)
    }

    /// Environment variables take priority over TOML values.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("PLAYMART_WAREHOUSE_HOST") {
            self.warehouse.host = host;
        }
        if let Ok(port) = std::env::var("PLAYMART_WAREHOUSE_PORT") {
            self.warehouse.port = port.parse().map_err(|_| {
                Error::Config(format!("PLAYMART_WAREHOUSE_PORT is not a port: {port}"))
            })?;
        }
        if let Ok(database) = std::env::var("PLAYMART_WAREHOUSE_DATABASE") {
            self.warehouse.database = database;
        }
        if let Ok(user) = std::env::var("PLAYMART_WAREHOUSE_USER") {
            self.warehouse.user = user;
        }
        if let Ok(password) = std::env::var("PLAYMART_WAREHOUSE_PASSWORD") {
            self.warehouse.password = password;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [warehouse]
        host = "dwh.example.internal"
        database = "playmart"
        user = "loader"
        password = "secret"

        [source]
        log_data = "s3://bucket/log_data"
        log_jsonpath = "s3://bucket/log_json_path.json"
        song_data = "s3://bucket/song_data"
        iam_role_arn = "arn:aws:iam::000000000000:role/dwhRole"
    "#;

    #[test]
    fn parses_full_config_with_defaults() {
        let config = Config::parse(EXAMPLE).unwrap();
        assert_eq!(config.warehouse.host, "dwh.example.internal");
        assert_eq!(config.warehouse.port, 5439);
        assert_eq!(config.source.region, "us-west-2");
        assert_eq!(config.source.log_data, "s3://bucket/log_data");
    }

    #[test]
    fn missing_warehouse_section_is_an_error() {
        assert!(Config::parse("[source]\nlog_data = \"s3://x\"").is_err());
    }

    #[test]
    fn missing_config_file_surfaces_as_io_error() {
        let err = Config::load(Path::new("/nonexistent/playmart.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn env_override_replaces_toml_value() {
        let mut config = Config::parse(EXAMPLE).unwrap();
        std::env::set_var("PLAYMART_WAREHOUSE_PASSWORD", "from-env");
        config.apply_env_overrides().unwrap();
        std::env::remove_var("PLAYMART_WAREHOUSE_PASSWORD");
        assert_eq!(config.warehouse.password, "from-env");
        assert_eq!(config.warehouse.user, "loader");
    }
}
