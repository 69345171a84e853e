//! Configuration file support for Kinetic.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/kinetic/config.toml`.

use crate::assistant::{CommandGateway, GeoPoint};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Exercise catalog source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON catalog replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Assistant request settings
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Program and arguments that answer prompts on stdin/stdout.
    /// Without one the assistant commands print their placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl AssistantConfig {
    /// Location for grounded answers; both coordinates must be set
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub fn gateway(&self) -> Option<CommandGateway> {
        self.command.as_deref().and_then(CommandGateway::from_argv)
    }
}

fn home_dir_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir_or_cwd().join(".local/share"));
    base.join("kinetic")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir_or_cwd().join(".config"));
        base.join("kinetic").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let a = &self.assistant;
        if a.latitude.is_some() != a.longitude.is_some() {
            return Err(Error::Config(
                "assistant.latitude and assistant.longitude must be set together".into(),
            ));
        }
        if let Some(lat) = a.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::Config(format!("latitude {} out of range", lat)));
            }
        }
        if let Some(lon) = a.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Error::Config(format!("longitude {} out of range", lon)));
            }
        }
        if let Some(command) = &a.command {
            if command.first().map_or(true, |program| program.trim().is_empty()) {
                return Err(Error::Config("assistant.command needs a program".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data.data_dir.ends_with("kinetic"));
        assert!(config.catalog.path.is_none());
        assert!(config.assistant.location().is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.data.data_dir = temp_dir.path().join("data");
        config.catalog.path = Some(temp_dir.path().join("catalog.json"));
        config.assistant.latitude = Some(51.5);
        config.assistant.longitude = Some(-0.12);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
        assert_eq!(loaded.catalog.path, config.catalog.path);
        assert_eq!(
            loaded.assistant.location(),
            Some(GeoPoint {
                latitude: 51.5,
                longitude: -0.12
            })
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[catalog]
path = "/srv/kinetic/catalog.json"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.catalog.path.as_deref(),
            Some(Path::new("/srv/kinetic/catalog.json"))
        );
        assert!(config.data.data_dir.ends_with("kinetic")); // default
    }

    #[test]
    fn test_assistant_command() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[assistant]\ncommand = [\"llm\", \"-m\", \"mini\"]\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.assistant.gateway(),
            Some(CommandGateway::new("llm", vec!["-m".into(), "mini".into()]))
        );
        assert!(Config::default().assistant.gateway().is_none());

        std::fs::write(&path, "[assistant]\ncommand = []\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_half_location_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[assistant]\nlatitude = 10.0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_out_of_range_location_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[assistant]\nlatitude = 95.0\nlongitude = 0.0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[data\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }
}
