//! Trigger-to-playback dispatch
//!
//! Translates a debounced button trigger into a play/pause toggle: read the
//! current remote state, pause if playing, otherwise start playback with the
//! schedule-derived default context. Remote failures abandon the current
//! trigger; the next press re-evaluates from scratch.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::schedule::PlaylistSchedule;
use crate::spotify::{PlaybackService, SpotifyError};

/// What a trigger ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Played,
    Paused,
}

pub struct TriggerDispatcher {
    playback: Arc<dyn PlaybackService>,
    schedule: Arc<RwLock<PlaylistSchedule>>,
}

impl TriggerDispatcher {
    pub fn new(
        playback: Arc<dyn PlaybackService>,
        schedule: Arc<RwLock<PlaylistSchedule>>,
    ) -> Self {
        Self { playback, schedule }
    }

    /// Handle one debounced trigger
    ///
    /// Best-effort: errors are returned for the caller to log, never panics.
    /// When the state read fails, neither play nor pause is attempted. A
    /// state change by another client between the read and the write is an
    /// accepted race.
    pub async fn handle_trigger(&self) -> Result<ToggleAction, SpotifyError> {
        let playing = match self.playback.current_playback().await {
            Ok(state) => state.map(|s| s.is_playing).unwrap_or(false),
            Err(e) => {
                warn!("Could not read playback state, ignoring trigger: {}", e);
                return Err(e);
            }
        };

        if playing {
            self.playback.pause().await?;
            info!("Button press: paused");
            Ok(ToggleAction::Paused)
        } else {
            let context = self.schedule.read().current_playlist();
            self.playback.play(context.as_deref()).await?;
            info!("Button press: playing");
            Ok(ToggleAction::Played)
        }
    }
}
