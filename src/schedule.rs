//! Time-of-day playlist schedule
//!
//! Maps wall-clock periods to playlist URIs so the button can start a
//! different default context in the morning than at night. Periods may wrap
//! midnight (e.g. 22:00-06:00).

use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// One schedule entry: `[start, end)` in local time
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimePeriod {
    /// "HH:MM", inclusive
    pub start: String,
    /// "HH:MM", exclusive
    pub end: String,
    /// Playlist/album URI started for presses inside this period
    pub playlist: String,
}

impl TimePeriod {
    fn contains(&self, time: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (parse_hhmm(&self.start), parse_hhmm(&self.end)) else {
            return false;
        };
        if start <= end {
            start <= time && time < end
        } else {
            // Wraps midnight
            time >= start || time < end
        }
    }
}

/// Ordered set of time periods; first match wins
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaylistSchedule {
    pub periods: Vec<TimePeriod>,
}

impl PlaylistSchedule {
    pub fn new(periods: Vec<TimePeriod>) -> Self {
        for period in &periods {
            if parse_hhmm(&period.start).is_none() || parse_hhmm(&period.end).is_none() {
                tracing::warn!(
                    "Ignoring schedule period with unparseable time: {} - {}",
                    period.start,
                    period.end
                );
            }
        }
        Self { periods }
    }

    /// Playlist for the given time, if any period matches
    pub fn playlist_for(&self, time: NaiveTime) -> Option<&str> {
        self.periods
            .iter()
            .find(|p| p.contains(time))
            .map(|p| p.playlist.as_str())
    }

    /// Playlist for the current local time
    pub fn current_playlist(&self) -> Option<String> {
        let now = Local::now().time();
        // Seconds don't matter for HH:MM periods
        let now = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now);
        self.playlist_for(now).map(str::to_string)
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}
