//! Pressplay - GPIO play/pause button for Spotify Connect
//!
//! Bridges a physical push button on a Raspberry Pi GPIO pin and a small JSON
//! web API to the Spotify Web API, so one press toggles playback on a
//! designated Connect device.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod input;
pub mod schedule;
pub mod spotify;
