//! Seed user configuration loaded from config.toml
//!
//! Identity is owned by an external provider. For local runs the registry can be
//! seeded with a list of usernames so invitations have someone to address.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Users to create on startup if they are missing
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Configuration for a single seeded user
#[derive(Debug, Deserialize, Clone)]
pub struct UserConfig {
    /// Unique login name
    pub username: String,
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads seed configuration from the default location (./config.toml).
///
/// A missing file is not an error; it yields an empty configuration.
pub fn load_default_config() -> Result<Config> {
    if Path::new("config.toml").exists() {
        load_config("config.toml")
    } else {
        Ok(Config::default())
    }
}
