//! Scriptable [`PlaybackService`] fake shared by unit tests

use async_trait::async_trait;
use parking_lot::Mutex;

use super::models::{Device, PlaybackSnapshot, Playlist, Track};
use super::{PlaybackService, SpotifyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Play(Option<String>),
    Pause,
    Next,
    Previous,
    SetVolume(u8),
    SelectDevice(String),
}

/// Fake remote service: fixed responses, recorded calls
pub struct FakePlayback {
    pub playing: Option<bool>,
    pub read_fails: bool,
    pub write_fails: bool,
    pub device_list: Vec<Device>,
    calls: Mutex<Vec<Call>>,
}

impl FakePlayback {
    pub fn with_state(playing: Option<bool>) -> Self {
        Self {
            playing,
            read_fails: false,
            write_fails: false,
            device_list: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn broken() -> Self {
        Self {
            read_fails: true,
            write_fails: true,
            ..Self::with_state(None)
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn remote_error() -> SpotifyError {
        SpotifyError::Api {
            status: 500,
            message: "remote failure".to_string(),
        }
    }

    fn write(&self, call: Call) -> Result<(), SpotifyError> {
        if self.write_fails {
            return Err(Self::remote_error());
        }
        self.calls.lock().push(call);
        Ok(())
    }

    fn snapshot(playing: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track: "Song".to_string(),
            artist: "Artist".to_string(),
            album: Some("Album".to_string()),
            album_image: None,
            duration_ms: 180_000,
            progress_ms: 45_000,
            is_playing: playing,
            volume: Some(70),
        }
    }
}

#[async_trait]
impl PlaybackService for FakePlayback {
    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, SpotifyError> {
        if self.read_fails {
            return Err(Self::remote_error());
        }
        Ok(self.playing.map(Self::snapshot))
    }

    async fn play(&self, context: Option<&str>) -> Result<(), SpotifyError> {
        self.write(Call::Play(context.map(str::to_string)))
    }

    async fn pause(&self) -> Result<(), SpotifyError> {
        self.write(Call::Pause)
    }

    async fn next_track(&self) -> Result<(), SpotifyError> {
        self.write(Call::Next)
    }

    async fn previous_track(&self) -> Result<(), SpotifyError> {
        self.write(Call::Previous)
    }

    async fn set_volume(&self, percent: u8) -> Result<(), SpotifyError> {
        self.write(Call::SetVolume(percent))
    }

    async fn devices(&self) -> Result<Vec<Device>, SpotifyError> {
        if self.read_fails {
            return Err(Self::remote_error());
        }
        Ok(self.device_list.clone())
    }

    async fn select_device(&self, device_id: &str) -> Result<(), SpotifyError> {
        self.write(Call::SelectDevice(device_id.to_string()))
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, SpotifyError> {
        if self.read_fails {
            return Err(Self::remote_error());
        }
        Ok(vec![Playlist {
            id: "p1".to_string(),
            name: "Workout".to_string(),
            uri: "spotify:playlist:p1".to_string(),
        }])
    }

    async fn search_tracks(&self, query: &str, _limit: u32) -> Result<Vec<Track>, SpotifyError> {
        if self.read_fails {
            return Err(Self::remote_error());
        }
        Ok(vec![Track {
            name: format!("Result for {}", query),
            uri: "spotify:track:t1".to_string(),
            duration_ms: 180_000,
            artists: Vec::new(),
            album: None,
        }])
    }

    fn is_configured(&self) -> bool {
        true
    }
}
