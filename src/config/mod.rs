//! Configuration storage

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::session::SessionOptions;

pub const DEFAULT_DISPLAY_NAME: &str = "Guest";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat backend base URL (REST and realtime share the host)
    pub endpoint: Option<String>,
    /// Integration API key
    pub credential: Option<String>,
    /// Name shown to operators for this device
    pub display_name: String,
    /// Seconds to wait for the realtime channel to connect
    pub connect_timeout_secs: u64,
    /// Seconds to wait for the join acknowledgment
    pub join_timeout_secs: u64,
    /// Messages requested during the initial history load
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            credential: None,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            join_timeout_secs: DEFAULT_JOIN_TIMEOUT_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "chat-session", "chat-session")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the API key)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Build session options, failing if endpoint or credential is missing.
    pub fn session_options(&self) -> Result<SessionOptions> {
        let endpoint = self
            .endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .context("No endpoint configured. Pass --endpoint or set it in config.toml.")?;
        let credential = self
            .credential
            .clone()
            .filter(|c| !c.is_empty())
            .context("No API key configured. Pass --key or set credential in config.toml.")?;

        let display_name = if self.display_name.trim().is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            self.display_name.clone()
        };

        let mut options = SessionOptions::new(endpoint, credential).with_display_name(display_name);
        options.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        options.join_timeout = Duration::from_secs(self.join_timeout_secs);
        options.history_limit = self.history_limit;
        Ok(options)
    }
}
