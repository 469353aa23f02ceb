use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{model::Coordinate, units::UnitPreferences};

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "METEOBLUE_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://my.meteoblue.com";
pub const DEFAULT_LOCATOR_URL: &str = "http://ip-api.com/json";

/// Fixed coordinates used as "current location" instead of a network lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl From<HomeConfig> for Coordinate {
    fn from(home: HomeConfig) -> Self {
        Coordinate::new(home.latitude, home.longitude).with_elevation(home.elevation)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// temperature_unit = "C"
/// windspeed_unit = "kmh"
/// precipitation_unit = "mm"
///
/// [home]
/// latitude = 47.56
/// longitude = 7.57
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(flatten)]
    pub units: UnitPreferences,

    /// Overrides the meteoblue endpoint, mostly useful for proxies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<HomeConfig>,
}

impl Config {
    /// Returns the API key if it is present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn locator_url(&self) -> &str {
        self.locator_url.as_deref().unwrap_or(DEFAULT_LOCATOR_URL)
    }

    /// Zero is treated as unset.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Load config from disk (or an empty default on first run), then apply
    /// the environment override.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.apply_env_api_key(&key);
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_api_key(&mut self, key: &str) {
        if !key.trim().is_empty() {
            self.set_api_key(key.to_string());
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "meteoblue", "meteoblue-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{PrecipitationUnit, TemperatureUnit, WindspeedUnit};

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        assert!(!cfg.has_api_key());

        cfg.api_key = Some("   ".into());
        assert_eq!(cfg.api_key(), None);

        cfg.set_api_key(" KEY ".into());
        assert_eq!(cfg.api_key(), Some("KEY"));
    }

    #[test]
    fn parses_flat_unit_keys_and_home() {
        let cfg = Config::from_toml(
            r#"
            api_key = "abc"
            temperature_unit = "F"
            windspeed_unit = "kn"
            precipitation_unit = "inch"

            [home]
            latitude = 47.56
            longitude = 7.57
            elevation = 260.0
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.api_key(), Some("abc"));
        assert_eq!(cfg.units.temperature, TemperatureUnit::Fahrenheit);
        assert_eq!(cfg.units.windspeed, WindspeedUnit::Kn);
        assert_eq!(cfg.units.precipitation, PrecipitationUnit::Inch);

        let home: Coordinate = cfg.home.expect("home must exist").into();
        assert_eq!(home.elevation, Some(260.0));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = Config::from_toml("").expect("empty config should parse");
        assert_eq!(cfg.units, UnitPreferences::default());
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.locator_url(), DEFAULT_LOCATOR_URL);
        assert_eq!(cfg.request_timeout(), None);
    }

    #[test]
    fn blank_env_key_does_not_override_file() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE".into());

        cfg.apply_env_api_key("  ");
        assert_eq!(cfg.api_key(), Some("FILE"));

        cfg.apply_env_api_key("ENV");
        assert_eq!(cfg.api_key(), Some("ENV"));
    }

    #[test]
    fn saved_toml_roundtrips_units() {
        let mut cfg = Config::default();
        cfg.units.windspeed = WindspeedUnit::Ms;
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("windspeed_unit = \"ms\""));
        assert_eq!(Config::from_toml(&text).unwrap().units.windspeed, WindspeedUnit::Ms);
    }
}
