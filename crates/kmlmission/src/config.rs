//! Configuration management for kmlmission.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ingest::DEFAULT_MISSION_NAME;
use crate::kml::CoordinatePolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "kmlmission";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "missions.db";

/// Default staging directory name.
const STAGING_DIR_NAME: &str = "uploads";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `KMLMISSION_`)
/// 2. TOML config file at `~/.config/kmlmission/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Ingestion configuration.
    pub ingest: IngestConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/kmlmission/missions.db`
    pub database_path: Option<PathBuf>,
}

/// Ingestion-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Name given to missions uploaded without one.
    pub default_mission_name: String,
    /// Directory where uploads are staged before ingestion.
    /// Defaults to `~/.local/share/kmlmission/uploads`
    pub staging_dir: Option<PathBuf>,
    /// How malformed coordinate tokens are handled.
    pub coordinate_policy: CoordinatePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_mission_name: DEFAULT_MISSION_NAME.to_string(),
            staging_dir: None,
            coordinate_policy: CoordinatePolicy::Lenient,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("KMLMISSION_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.default_mission_name.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "default_mission_name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the staging directory, resolving defaults if not set.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.ingest
            .staging_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STAGING_DIR_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.ingest.default_mission_name, "Imported KML Mission");
        assert_eq!(config.ingest.coordinate_policy, CoordinatePolicy::Lenient);
        assert!(config.ingest.staging_dir.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_default_name() {
        let mut config = Config::default();
        config.ingest.default_mission_name = "   ".to_string();

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("default_mission_name"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("missions.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_staging_dir_default() {
        let config = Config::default();
        let path = config.staging_dir();

        assert!(path.ends_with("kmlmission/uploads"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("kmlmission"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    // `Jail` serializes these tests and restores the environment, since
    // `load_from` reads process-wide `KMLMISSION_*` variables.

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[storage]
database_path = "/srv/missions.db"

[ingest]
default_mission_name = "Survey"
coordinate_policy = "strict"
"#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.database_path(), PathBuf::from("/srv/missions.db"));
            assert_eq!(config.ingest.default_mission_name, "Survey");
            assert_eq!(config.ingest.coordinate_policy, CoordinatePolicy::Strict);
            Ok(())
        });
    }

    #[test]
    fn test_env_nested_keys_use_double_underscore() {
        Jail::expect_with(|jail| {
            jail.set_env("KMLMISSION_INGEST__COORDINATE_POLICY", "strict");
            jail.set_env("KMLMISSION_INGEST__DEFAULT_MISSION_NAME", "From env");
            jail.set_env("KMLMISSION_STORAGE__DATABASE_PATH", "/var/lib/kml/m.db");

            let config = Config::load_from(Some(PathBuf::from("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.ingest.coordinate_policy, CoordinatePolicy::Strict);
            assert_eq!(config.ingest.default_mission_name, "From env");
            assert_eq!(config.database_path(), PathBuf::from("/var/lib/kml/m.db"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[ingest]
default_mission_name = "From file"
coordinate_policy = "lenient"
staging_dir = "/tmp/file-staging"
"#,
            )?;
            jail.set_env("KMLMISSION_INGEST__COORDINATE_POLICY", "strict");
            jail.set_env("KMLMISSION_INGEST__DEFAULT_MISSION_NAME", "From env");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.ingest.coordinate_policy, CoordinatePolicy::Strict);
            assert_eq!(config.ingest.default_mission_name, "From env");
            assert_eq!(config.staging_dir(), PathBuf::from("/tmp/file-staging"));
            Ok(())
        });
    }

    #[test]
    fn test_single_underscore_env_does_not_nest() {
        Jail::expect_with(|jail| {
            jail.set_env("KMLMISSION_INGEST_COORDINATE_POLICY", "strict");

            let config = Config::load_from(Some(PathBuf::from("missing.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.ingest.coordinate_policy, CoordinatePolicy::Lenient);
            Ok(())
        });
    }

    #[test]
    fn test_blank_env_name_fails_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("KMLMISSION_INGEST__DEFAULT_MISSION_NAME", "  ");

            let err = Config::load_from(Some(PathBuf::from("missing.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[ingest]\ndefault_mission_name = \"\"\n")?;

            let err = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_unknown_policy() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[ingest]\ncoordinate_policy = \"sloppy\"\n")?;

            let err = Config::load_from(Some(PathBuf::from("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigLoad(_)));
            Ok(())
        });
    }

    #[test]
    fn test_ingest_config_deserialize() {
        let json = r#"{"default_mission_name": "X", "coordinate_policy": "strict"}"#;
        let ingest: IngestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(ingest.default_mission_name, "X");
        assert_eq!(ingest.coordinate_policy, CoordinatePolicy::Strict);
        assert!(ingest.staging_dir.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("default_mission_name"));
        assert!(json.contains("lenient"));
    }
}
