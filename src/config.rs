//! Configuration management for Pressplay
//!
//! Handles loading and validating the YAML configuration file. Secrets fall
//! back to environment variables so a config file never has to contain them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::schedule::TimePeriod;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
    #[serde(default)]
    pub web: WebConfig,
    /// Time-of-day default playlists, checked when the button starts playback
    #[serde(default)]
    pub schedule: Vec<TimePeriod>,
}

/// Spotify Web API credentials and playback defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Connect device to look for at startup (case-insensitive substring)
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Context started when nothing else is queued (playlist/album URI)
    #[serde(default)]
    pub default_playlist: Option<String>,
    /// Volume applied after the button starts playback
    #[serde(default = "default_volume")]
    pub volume: u8,
}

/// GPIO input configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpioConfig {
    /// BCM pin number of the button input
    #[serde(default = "default_pin")]
    pub pin: u8,
    /// Minimum seconds between two accepted button presses
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: f64,
}

/// Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            device_name: default_device_name(),
            default_playlist: None,
            volume: default_volume(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            debounce_secs: default_debounce_secs(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, falling back to defaults when missing
    pub async fn load(path: &str) -> Result<Self> {
        let mut config = match fs::read_to_string(path).await {
            Ok(contents) => Self::load_from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path);
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {}", path))
            }
        };

        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn load_from_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fill missing credentials from the environment
    ///
    /// The config file wins when both are set.
    pub fn apply_env_fallbacks(&mut self) {
        let fallbacks = [
            (&mut self.spotify.client_id, "SPOTIFY_CLIENT_ID"),
            (&mut self.spotify.client_secret, "SPOTIFY_CLIENT_SECRET"),
            (&mut self.spotify.refresh_token, "SPOTIFY_REFRESH_TOKEN"),
        ];
        for (slot, var) in fallbacks {
            if slot.as_deref().unwrap_or("").is_empty() {
                *slot = std::env::var(var).ok().filter(|v| !v.is_empty());
            }
        }
    }

    /// Check the configuration for implausible values
    ///
    /// Returns warnings rather than failing: none of these stop the system
    /// from running, they just make it unlikely to do anything useful.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.spotify.client_id.is_none() || self.spotify.client_secret.is_none() {
            warnings.push(
                "Spotify credentials missing (client_id/client_secret) - remote calls will fail"
                    .to_string(),
            );
        }
        if self.spotify.refresh_token.is_none() {
            warnings.push("Spotify refresh_token missing - remote calls will fail".to_string());
        }
        if self.spotify.volume > 100 {
            warnings.push(format!(
                "spotify.volume {} out of range (0-100)",
                self.spotify.volume
            ));
        }

        if !(1..=40).contains(&self.gpio.pin) {
            warnings.push(format!("gpio.pin {} may not be a valid BCM pin", self.gpio.pin));
        }
        if !(0.1..=5.0).contains(&self.gpio.debounce_secs) {
            warnings.push(format!(
                "gpio.debounce_secs {} outside the plausible 0.1-5.0 range",
                self.gpio.debounce_secs
            ));
        }

        if self.web.port < 1024 {
            warnings.push(format!("web.port {} is privileged", self.web.port));
        }

        warnings
    }
}

fn default_device_name() -> String {
    "raspberrypi".to_string()
}

fn default_volume() -> u8 {
    70
}

fn default_pin() -> u8 {
    18
}

fn default_debounce_secs() -> f64 {
    0.5
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    5000
}
