use crate::capture::CaptureConfig;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub capture: CaptureConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Preferred browser binary. Tried first; PATH discovery is the fallback.
    pub binary_path: String,
    /// Preferred chromedriver binary matching `binary_path`.
    pub driver_path: String,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory where capture artifacts are written before upload.
    pub output_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary_path: "/usr/bin/chromium".to_string(),
            driver_path: "/usr/bin/chromedriver".to_string(),
            headless: true,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("meetcap").join("config.toml"))
    }
}

/// Google account used to join meetings. Supplied via environment variables,
/// never via the request payload.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let identity =
            std::env::var("GMAIL_ADDRESS").context("GMAIL_ADDRESS environment variable not set")?;
        let secret = std::env::var("GMAIL_PASSWORD")
            .context("GMAIL_PASSWORD environment variable not set")?;
        ensure!(!identity.trim().is_empty(), "GMAIL_ADDRESS is empty");
        ensure!(!secret.is_empty(), "GMAIL_PASSWORD is empty");
        Ok(Self { identity, secret })
    }
}

/// OAuth2 refresh-token credentials for the Google Drive API.
#[derive(Debug, Clone)]
pub struct DriveCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl DriveCredentials {
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_OAUTH_CLIENT_ID")
            .context("GOOGLE_OAUTH_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_OAUTH_CLIENT_SECRET")
            .context("GOOGLE_OAUTH_CLIENT_SECRET environment variable not set")?;
        let refresh_token = std::env::var("GOOGLE_OAUTH_REFRESH_TOKEN")
            .context("GOOGLE_OAUTH_REFRESH_TOKEN environment variable not set")?;
        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&content).unwrap();
        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.browser.driver_path, "/usr/bin/chromedriver");
        assert!(parsed.browser.headless);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.browser.binary_path, "/usr/bin/chromium");
        assert_eq!(parsed.recording.output_dir, PathBuf::from("recordings"));
    }
}
