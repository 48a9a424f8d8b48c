//! Spotify Web API integration
//!
//! The rest of the crate talks to the remote playback service through the
//! [`PlaybackService`] trait; [`SpotifyClient`] is the production
//! implementation, tests substitute fakes.

mod auth;
mod client;
pub mod models;
#[cfg(test)]
pub(crate) mod testing;

pub use auth::TokenSource;
pub use client::SpotifyClient;

use async_trait::async_trait;
use thiserror::Error;

use models::{Device, PlaybackSnapshot, Playlist, Track};

#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Credentials were never supplied; every remote call fails with this
    #[error("Spotify client not configured (missing credentials)")]
    NotConfigured,

    #[error("Spotify authentication failed: {0}")]
    Auth(String),

    /// No Connect device to act on
    #[error("no Spotify device available")]
    NoDevice,

    #[error("Spotify API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Spotify request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Remote playback service operations
///
/// Mirrors what the dispatcher and the web API need; every method is a
/// network call with no local caching beyond the selected device.
#[async_trait]
pub trait PlaybackService: Send + Sync {
    /// Current playback state, `None` when nothing is active
    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, SpotifyError>;

    /// Start playback on the selected device
    ///
    /// Falls back to the configured default context when `context` is `None`.
    async fn play(&self, context: Option<&str>) -> Result<(), SpotifyError>;

    async fn pause(&self) -> Result<(), SpotifyError>;

    async fn next_track(&self) -> Result<(), SpotifyError>;

    async fn previous_track(&self) -> Result<(), SpotifyError>;

    /// Set volume (0-100) on the selected device
    async fn set_volume(&self, percent: u8) -> Result<(), SpotifyError>;

    /// List available Connect devices
    async fn devices(&self) -> Result<Vec<Device>, SpotifyError>;

    /// Transfer playback to the device and remember it for later calls
    async fn select_device(&self, device_id: &str) -> Result<(), SpotifyError>;

    /// The user's playlists (first page)
    async fn playlists(&self) -> Result<Vec<Playlist>, SpotifyError>;

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, SpotifyError>;

    /// Whether credentials were supplied at construction
    fn is_configured(&self) -> bool;
}
