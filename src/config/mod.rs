//! Configuration management for the CANAGROSA admin client.
//!
//! Configuration lives in a TOML file under the platform config directory
//! (`<config_dir>/canagrosa/config.toml`), or under the directory named by
//! `CANAGROSA_CONFIG_DIR` when that variable is set. A missing file yields
//! the defaults. Tokens are never stored here; see [`crate::api::auth`].

mod profile;
mod settings;

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::Profile;
pub use settings::Settings;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CANAGROSA_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    #[error("failed to create configuration directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("failed to read configuration file: {0}")]
    ReadError(std::io::Error),

    #[error("failed to write configuration file: {0}")]
    WriteError(std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// The full configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Directory holding the configuration file.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|d| d.join("canagrosa"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load the configuration, falling back to defaults if the file does
    /// not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(ConfigError::ReadError)?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), profiles = config.profiles.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and write the configuration file, creating its directory.
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).map_err(ConfigError::CreateDirError)?;
        let content = toml::to_string_pretty(self)?;
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, content).map_err(ConfigError::WriteError)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check every profile, profile-name uniqueness, the default profile
    /// reference and the settings.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }
        if let Some(default) = &self.settings.default_profile {
            if !self.profiles.iter().any(|p| &p.name == default) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' is not defined",
                    default
                )));
            }
        }
        self.settings.validate()
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// The profile to use: the named one, else the configured default,
    /// else the only profile if there is exactly one.
    pub fn resolve_profile(&self, requested: Option<&str>) -> Result<&Profile> {
        if let Some(name) = requested.or(self.settings.default_profile.as_deref()) {
            return self.profile(name);
        }
        match self.profiles.as_slice() {
            [only] => Ok(only),
            [] => Err(ConfigError::ValidationError(
                "no profiles configured".to_string(),
            )),
            _ => Err(ConfigError::ValidationError(
                "several profiles configured; pass --profile or set settings.default_profile"
                    .to_string(),
            )),
        }
    }
}
