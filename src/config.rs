use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::location::DEFAULT_LOCATION_URL;
use crate::state::UserLocation;

/// Environment variables checked for the Gemini key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Read-only; the file is edited by hand
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub location_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub auto_location: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Key from the environment first, then the config file. Empty when unset;
    /// the provider rejects the call in that case.
    pub fn resolve_api_key(&self) -> String {
        API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.api_key.clone())
            .unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn location_url(&self) -> &str {
        self.location_url.as_deref().unwrap_or(DEFAULT_LOCATION_URL)
    }

    pub fn auto_location(&self) -> bool {
        self.auto_location.unwrap_or(true)
    }

    /// A fixed position, when both coordinates are configured
    pub fn fixed_location(&self) -> Option<UserLocation> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(UserLocation::new(lat, lon)),
            _ => None,
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("geoguide").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(config.auto_location());
        assert!(config.fixed_location().is_none());
    }

    #[test]
    fn test_load_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "model": "gemini-2.5-pro", "latitude": 35.0, "longitude": 139.0, "auto_location": false }"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.model(), "gemini-2.5-pro");
        assert_eq!(loaded.fixed_location(), Some(UserLocation::new(35.0, 139.0)));
        assert!(!loaded.auto_location());
        assert_eq!(loaded.base_url(), DEFAULT_BASE_URL);
        assert!(loaded.api_key.is_none());
    }

    #[test]
    fn test_partial_coordinates_are_ignored() {
        let config = Config {
            latitude: Some(10.0),
            ..Config::new()
        };
        assert!(config.fixed_location().is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
