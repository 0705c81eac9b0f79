//! YAML configuration for store profiles and reconciliation defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use term_rollover_core::{parse_date, Cutover, RolloverError};
use term_rollover_store_sqlite::StoreProfile;
use thiserror::Error;
use time::Date;

/// Config file read when no path is given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "eos.yaml";

pub const PRIMARY: &str = "primary";
pub const SECONDARY: &str = "secondary";
pub const ARCHIVE: &str = "archive";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileConfig {
    pub path: PathBuf,
}

impl ProfileConfig {
    fn at(path: &str) -> Self {
        Self { path: PathBuf::from(path) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilesConfig {
    #[serde(default = "default_primary")]
    pub primary: ProfileConfig,
    #[serde(default = "default_secondary")]
    pub secondary: ProfileConfig,
    #[serde(default = "default_archive")]
    pub archive: ProfileConfig,
}

fn default_primary() -> ProfileConfig {
    ProfileConfig::at("./data/primary.sqlite3")
}

fn default_secondary() -> ProfileConfig {
    ProfileConfig::at("./data/secondary.sqlite3")
}

fn default_archive() -> ProfileConfig {
    ProfileConfig::at("./data/archive.sqlite3")
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self { primary: default_primary(), secondary: default_secondary(), archive: default_archive() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// ISO date writes moved to the secondary store.
    #[serde(default)]
    pub cutover_date: Option<String>,
    /// Minutes after midnight on `cutover_date`.
    #[serde(default)]
    pub cutover_minutes: u16,
    /// Where the plain-text report is written.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Read `path` if given, else `eos.yaml` in the working directory if it
    /// exists, else built-in defaults.
    ///
    /// # Errors
    /// Returns an error when the chosen file cannot be read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_path(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// # Errors
    /// Returns an error when the file cannot be read, parsed, or validated.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(content.as_str())
    }

    /// # Errors
    /// Returns an error when the YAML is malformed or fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, profile) in self.named_profiles() {
            if profile.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("profile {name} has an empty path")));
            }
        }
        if self.reconcile.cutover_minutes >= 24 * 60 {
            return Err(ConfigError::Validation(format!(
                "cutover_minutes must be below 1440, got {}",
                self.reconcile.cutover_minutes
            )));
        }
        if let Some(date) = &self.reconcile.cutover_date {
            parse_date(date).map_err(|err| ConfigError::Validation(err.to_string()))?;
        }
        Ok(())
    }

    fn named_profiles(&self) -> [(&'static str, &ProfileConfig); 3] {
        [
            (PRIMARY, &self.profiles.primary),
            (SECONDARY, &self.profiles.secondary),
            (ARCHIVE, &self.profiles.archive),
        ]
    }

    /// Replace a profile's path, as the command line does.
    ///
    /// # Errors
    /// Returns `RolloverError::ProfileNotFound` for an unknown profile name.
    pub fn override_path(&mut self, name: &str, path: PathBuf) -> Result<(), RolloverError> {
        let profile = match name {
            PRIMARY => &mut self.profiles.primary,
            SECONDARY => &mut self.profiles.secondary,
            ARCHIVE => &mut self.profiles.archive,
            other => return Err(RolloverError::ProfileNotFound(other.to_string())),
        };
        profile.path = path;
        Ok(())
    }

    /// # Errors
    /// Returns `RolloverError::ProfileNotFound` for an unknown profile name.
    pub fn profile(&self, name: &str) -> Result<StoreProfile, RolloverError> {
        self.named_profiles()
            .into_iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(name, profile)| StoreProfile::new(name, profile.path.clone()))
            .ok_or_else(|| RolloverError::ProfileNotFound(name.to_string()))
    }

    /// Cutover from the command line where given, else from configuration.
    ///
    /// # Errors
    /// Returns `RolloverError::Validation` when no cutover date is known or
    /// the minutes are out of range.
    pub fn cutover(&self, date: Option<Date>, minutes: Option<u16>) -> Result<Cutover, RolloverError> {
        let date = match (date, &self.reconcile.cutover_date) {
            (Some(date), _) => date,
            (None, Some(configured)) => parse_date(configured)?,
            (None, None) => {
                return Err(RolloverError::Validation(
                    "no cutover date configured; pass --cutover-date".to_string(),
                ))
            }
        };
        Cutover::new(date, minutes.unwrap_or(self.reconcile.cutover_minutes))
    }
}
