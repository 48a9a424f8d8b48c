//! Spotify Web API client
//!
//! Thin wrapper over the player endpoints. Every call fetches a token from
//! the [`TokenSource`], issues one request, and maps non-2xx statuses to
//! [`SpotifyError::Api`]. The only local state is the selected Connect
//! device.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{info, warn};

use super::auth::TokenSource;
use super::models::{
    CurrentPlayback, Device, DevicesResponse, PlaybackSnapshot, Playlist, PlaylistsResponse,
    SearchResponse, Track,
};
use super::{PlaybackService, SpotifyError};
use crate::config::SpotifyConfig;

const API_BASE: &str = "https://api.spotify.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<TokenSource>,
    device_name: String,
    default_playlist: Option<String>,
    default_volume: u8,
    selected_device: RwLock<Option<String>>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Result<Self, SpotifyError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let token = match (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.refresh_token.clone(),
        ) {
            (Some(id), Some(secret), Some(refresh)) => {
                Some(TokenSource::new(http.clone(), id, secret, refresh))
            }
            _ => None,
        };

        Ok(Self {
            http,
            api_base: API_BASE.to_string(),
            token,
            device_name: config.device_name.clone(),
            default_playlist: config.default_playlist.clone(),
            default_volume: config.volume.min(100),
            selected_device: RwLock::new(None),
        })
    }

    /// Resolve the configured device name against the available devices
    ///
    /// Case-insensitive substring match; falls back to the first available
    /// device with a warning. No device at all is a warning, not an error.
    pub async fn discover_device(&self) -> Result<(), SpotifyError> {
        let devices = self.devices().await?;
        let wanted = self.device_name.to_lowercase();

        let matched = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&wanted));
        let chosen = match matched {
            Some(device) => Some(device),
            None => {
                if let Some(first) = devices.first() {
                    warn!(
                        "Device '{}' not found, using '{}'",
                        self.device_name, first.name
                    );
                }
                devices.first()
            }
        };

        match chosen.and_then(|d| d.id.clone().map(|id| (id, d.name.clone()))) {
            Some((id, name)) => {
                info!("Using playback device: {} ({})", name, id);
                *self.selected_device.write() = Some(id);
            }
            None => warn!("No Spotify devices available"),
        }
        Ok(())
    }

    pub fn selected_device(&self) -> Option<String> {
        self.selected_device.read().clone()
    }

    async fn bearer(&self) -> Result<String, SpotifyError> {
        match &self.token {
            Some(source) => source.access_token().await,
            None => Err(SpotifyError::NotConfigured),
        }
    }

    /// Selected device, discovering one first if necessary
    async fn ensure_device(&self) -> Result<String, SpotifyError> {
        if let Some(id) = self.selected_device.read().clone() {
            return Ok(id);
        }
        self.discover_device().await?;
        self.selected_device
            .read()
            .clone()
            .ok_or(SpotifyError::NoDevice)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Query pair for the selected device, when one is selected
    fn device_query(&self) -> Vec<(String, String)> {
        match self.selected_device.read().clone() {
            Some(id) => vec![("device_id".to_string(), id)],
            None => Vec::new(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(SpotifyError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PlaybackService for SpotifyClient {
    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.endpoint("/me/player"))
            .bearer_auth(&token)
            .send()
            .await?;

        // 204: nothing playing anywhere
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let playback: CurrentPlayback = Self::check(response).await?.json().await?;
        Ok(PlaybackSnapshot::from_playback(playback))
    }

    async fn play(&self, context: Option<&str>) -> Result<(), SpotifyError> {
        let device_id = self.ensure_device().await?;
        let token = self.bearer().await?;

        let context = context
            .map(str::to_string)
            .or_else(|| self.default_playlist.clone());
        let body = match &context {
            Some(uri) => serde_json::json!({ "context_uri": uri }),
            None => serde_json::json!({}),
        };

        let response = self
            .http
            .put(self.endpoint("/me/player/play"))
            .bearer_auth(&token)
            .query(&[("device_id", device_id.as_str())])
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        info!("Playback started");

        // Bring the device to the configured volume after starting; a failure
        // here doesn't undo the play
        if let Err(e) = self.set_volume(self.default_volume).await {
            warn!("Failed to apply startup volume: {}", e);
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .put(self.endpoint("/me/player/pause"))
            .bearer_auth(&token)
            .query(&self.device_query())
            .send()
            .await?;
        Self::check(response).await?;
        info!("Playback paused");
        Ok(())
    }

    async fn next_track(&self) -> Result<(), SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.endpoint("/me/player/next"))
            .bearer_auth(&token)
            .query(&self.device_query())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn previous_track(&self) -> Result<(), SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .post(self.endpoint("/me/player/previous"))
            .bearer_auth(&token)
            .query(&self.device_query())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_volume(&self, percent: u8) -> Result<(), SpotifyError> {
        let percent = percent.min(100);
        let token = self.bearer().await?;

        let mut query = vec![("volume_percent".to_string(), percent.to_string())];
        query.extend(self.device_query());

        let response = self
            .http
            .put(self.endpoint("/me/player/volume"))
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.endpoint("/me/player/devices"))
            .bearer_auth(&token)
            .send()
            .await?;
        let devices: DevicesResponse = Self::check(response).await?.json().await?;
        Ok(devices.devices)
    }

    async fn select_device(&self, device_id: &str) -> Result<(), SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .put(self.endpoint("/me/player"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "device_ids": [device_id], "play": false }))
            .send()
            .await?;
        Self::check(response).await?;

        *self.selected_device.write() = Some(device_id.to_string());
        info!("Playback transferred to device {}", device_id);
        Ok(())
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.endpoint("/me/playlists"))
            .bearer_auth(&token)
            .query(&[("limit", "50")])
            .send()
            .await?;
        let playlists: PlaylistsResponse = Self::check(response).await?.json().await?;
        Ok(playlists.items)
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, SpotifyError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.endpoint("/search"))
            .bearer_auth(&token)
            .query(&[
                ("q", query),
                ("type", "track"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;
        let results: SearchResponse = Self::check(response).await?.json().await?;
        Ok(results.tracks.items)
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
