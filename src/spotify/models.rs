//! Wire models for the Spotify Web API
//!
//! Raw response shapes deserialized with serde, plus the flattened
//! [`PlaybackSnapshot`] the rest of the crate consumes.

use serde::{Deserialize, Serialize};

/// A Spotify Connect device
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Device {
    /// Absent for restricted devices
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
    pub volume_percent: Option<u8>,
}

/// GET /me/player/devices
#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

/// GET /me/player (when a 200 body is present)
#[derive(Debug, Deserialize)]
pub struct CurrentPlayback {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub device: Option<Device>,
    pub item: Option<Track>,
}

/// A track as returned by the player and search endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    pub url: String,
}

/// GET /me/playlists
#[derive(Debug, Deserialize)]
pub struct PlaylistsResponse {
    pub items: Vec<Playlist>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: String,
}

/// GET /search?type=track
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
pub struct TrackPage {
    pub items: Vec<Track>,
}

/// Flattened playback state consumed by the dispatcher and the web API
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub track: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_image: Option<String>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub is_playing: bool,
    pub volume: Option<u8>,
}

impl PlaybackSnapshot {
    /// Flatten the raw player response; `None` when no track is loaded
    pub fn from_playback(playback: CurrentPlayback) -> Option<Self> {
        let track = playback.item?;
        let artist = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let (album, album_image) = match track.album {
            Some(album) => {
                let image = album.images.first().map(|i| i.url.clone());
                (Some(album.name), image)
            }
            None => (None, None),
        };

        Some(Self {
            track: track.name,
            artist,
            album,
            album_image,
            duration_ms: track.duration_ms,
            progress_ms: playback.progress_ms.unwrap_or(0),
            is_playing: playback.is_playing,
            volume: playback.device.and_then(|d| d.volume_percent),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_playback() {
        let raw = r#"{
            "is_playing": true,
            "progress_ms": 45000,
            "device": {"id": "d1", "name": "Kitchen", "type": "Speaker",
                       "is_active": true, "volume_percent": 70},
            "item": {
                "name": "Song",
                "uri": "spotify:track:x",
                "duration_ms": 180000,
                "artists": [{"name": "A"}, {"name": "B"}],
                "album": {"name": "Album", "images": [{"url": "http://img"}]}
            }
        }"#;
        let playback: CurrentPlayback = serde_json::from_str(raw).unwrap();
        let snapshot = PlaybackSnapshot::from_playback(playback).unwrap();

        assert_eq!(snapshot.track, "Song");
        assert_eq!(snapshot.artist, "A, B");
        assert_eq!(snapshot.album.as_deref(), Some("Album"));
        assert_eq!(snapshot.album_image.as_deref(), Some("http://img"));
        assert_eq!(snapshot.progress_ms, 45000);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.volume, Some(70));
    }

    #[test]
    fn test_snapshot_without_item_is_none() {
        let raw = r#"{"is_playing": false, "progress_ms": null, "device": null, "item": null}"#;
        let playback: CurrentPlayback = serde_json::from_str(raw).unwrap();
        assert!(PlaybackSnapshot::from_playback(playback).is_none());
    }

    #[test]
    fn test_device_type_rename() {
        let raw = r#"{"id": null, "name": "Web Player", "type": "Computer",
                      "is_active": false, "volume_percent": null}"#;
        let device: Device = serde_json::from_str(raw).unwrap();
        assert_eq!(device.kind, "Computer");
        assert!(device.id.is_none());
        assert!(!device.is_restricted);
    }
}
