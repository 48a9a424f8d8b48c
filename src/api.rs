//! JSON web API
//!
//! The dashboard surface: playback commands, device and playlist listings,
//! GPIO status and the playlist schedule. JSON only, permissive CORS so any
//! external dashboard can talk to it. Default port: 5000.

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::dispatcher::{ToggleAction, TriggerDispatcher};
use crate::input::PinMonitor;
use crate::schedule::{PlaylistSchedule, TimePeriod};
use crate::spotify::models::PlaybackSnapshot;
use crate::spotify::PlaybackService;

/// Shared state for API handlers
pub struct ApiState {
    pub playback: Arc<dyn PlaybackService>,
    pub monitor: Arc<PinMonitor>,
    pub dispatcher: Arc<TriggerDispatcher>,
    pub schedule: Arc<RwLock<PlaylistSchedule>>,
    /// BCM pin number the monitor samples
    pub pin: u8,
}

/// System status returned by GET /api/status
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub spotify_configured: bool,
    pub monitoring: bool,
    pub simulated: bool,
    pub pin: u8,
    pub pin_state: bool,
    pub debounce_secs: f64,
    pub last_updated: String,
    pub current_track: Option<PlaybackSnapshot>,
}

/// Standard reply for playback commands
#[derive(Debug, Serialize)]
struct CommandResponse {
    ok: bool,
    message: String,
}

impl CommandResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
        })
    }
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    /// Remote-call failures surface as 502: the request was fine, Spotify
    /// wasn't
    fn upstream(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            error: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
struct PlayRequest {
    context_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeRequest {
    volume: i64,
}

#[derive(Debug, Deserialize)]
struct DeviceRequest {
    device_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    periods: Vec<TimePeriod>,
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/status", get(system_status))
        .route("/api/play", post(play))
        .route("/api/pause", post(pause))
        .route("/api/toggle", post(toggle))
        .route("/api/next", post(next_track))
        .route("/api/previous", post(previous_track))
        .route("/api/volume", post(set_volume))
        .route("/api/devices", get(list_devices))
        .route("/api/device", post(select_device))
        .route("/api/playlists", get(list_playlists))
        .route("/api/search", get(search_tracks))
        .route("/api/gpio", get(gpio_status))
        .route("/api/gpio/monitoring", post(toggle_monitoring))
        .route("/api/trigger", post(fire_trigger))
        .route("/api/schedule", get(get_schedule).put(set_schedule))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/health
async fn health_check() -> &'static str {
    "ok"
}

/// GET /api/status - full system status for the dashboard
async fn system_status(State(state): State<Arc<ApiState>>) -> Json<SystemStatus> {
    // Best-effort: a failed remote read leaves the track empty
    let current_track = match state.playback.current_playback().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Status playback read failed: {}", e);
            None
        }
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        spotify_configured: state.playback.is_configured(),
        monitoring: state.monitor.is_monitoring(),
        simulated: state.monitor.is_simulated(),
        pin: state.pin,
        pin_state: state.monitor.pin_state(),
        debounce_secs: state.monitor.debounce().as_secs_f64(),
        last_updated: chrono::Local::now().format("%H:%M:%S").to_string(),
        current_track,
    })
}

/// POST /api/play - start playback, optionally with an explicit context
async fn play(
    State(state): State<Arc<ApiState>>,
    body: Option<Json<PlayRequest>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    state
        .playback
        .play(request.context_uri.as_deref())
        .await
        .map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok("Playback started"))
}

/// POST /api/pause
async fn pause(State(state): State<Arc<ApiState>>) -> Result<Json<CommandResponse>, ApiError> {
    state.playback.pause().await.map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok("Playback paused"))
}

/// POST /api/toggle - same read-then-write pair the button uses
async fn toggle(State(state): State<Arc<ApiState>>) -> Result<Json<CommandResponse>, ApiError> {
    let action = state
        .dispatcher
        .handle_trigger()
        .await
        .map_err(ApiError::upstream)?;
    let message = match action {
        ToggleAction::Played => "Playback started",
        ToggleAction::Paused => "Playback paused",
    };
    Ok(CommandResponse::ok(message))
}

/// POST /api/next
async fn next_track(State(state): State<Arc<ApiState>>) -> Result<Json<CommandResponse>, ApiError> {
    state
        .playback
        .next_track()
        .await
        .map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok("Skipped to next track"))
}

/// POST /api/previous
async fn previous_track(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    state
        .playback
        .previous_track()
        .await
        .map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok("Skipped to previous track"))
}

/// POST /api/volume
async fn set_volume(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<VolumeRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    if !(0..=100).contains(&request.volume) {
        return Err(ApiError::bad_request(format!(
            "volume {} out of range (0-100)",
            request.volume
        )));
    }
    state
        .playback
        .set_volume(request.volume as u8)
        .await
        .map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok(format!(
        "Volume set to {}%",
        request.volume
    )))
}

/// GET /api/devices
async fn list_devices(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let devices = state
        .playback
        .devices()
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(serde_json::json!({ "devices": devices })))
}

/// POST /api/device - transfer playback to a device
async fn select_device(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DeviceRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    if request.device_id.is_empty() {
        return Err(ApiError::bad_request("device_id missing"));
    }
    state
        .playback
        .select_device(&request.device_id)
        .await
        .map_err(ApiError::upstream)?;
    Ok(CommandResponse::ok("Device selected"))
}

/// GET /api/playlists
async fn list_playlists(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let playlists = state
        .playback
        .playlists()
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(serde_json::json!({ "playlists": playlists })))
}

/// GET /api/search?q=...
async fn search_tracks(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("search query missing"));
    }
    let tracks = state
        .playback
        .search_tracks(&params.q, params.limit.unwrap_or(20))
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(serde_json::json!({ "tracks": tracks })))
}

/// GET /api/gpio
async fn gpio_status(State(state): State<Arc<ApiState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "pin": state.pin,
        "backend": state.monitor.reader_description(),
        "state": state.monitor.pin_state(),
        "monitoring": state.monitor.is_monitoring(),
        "simulated": state.monitor.is_simulated(),
        "debounce_secs": state.monitor.debounce().as_secs_f64(),
    }))
}

/// POST /api/gpio/monitoring - toggle the sampling loop
async fn toggle_monitoring(State(state): State<Arc<ApiState>>) -> Json<CommandResponse> {
    if state.monitor.is_monitoring() {
        // stop() blocks on the sampling thread handshake
        let monitor = Arc::clone(&state.monitor);
        let _ = tokio::task::spawn_blocking(move || monitor.stop()).await;
        CommandResponse::ok("Monitoring stopped")
    } else {
        state.monitor.start();
        CommandResponse::ok("Monitoring started")
    }
}

/// POST /api/trigger - fire the dispatcher as if the button were pressed
async fn fire_trigger(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CommandResponse>, ApiError> {
    info!("Manual trigger requested via API");
    let action = state
        .dispatcher
        .handle_trigger()
        .await
        .map_err(ApiError::upstream)?;
    let message = match action {
        ToggleAction::Played => "Trigger handled: playing",
        ToggleAction::Paused => "Trigger handled: paused",
    };
    Ok(CommandResponse::ok(message))
}

/// GET /api/schedule
async fn get_schedule(State(state): State<Arc<ApiState>>) -> Json<PlaylistSchedule> {
    Json(state.schedule.read().clone())
}

/// PUT /api/schedule - replace the schedule (in memory; lost on restart)
async fn set_schedule(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ScheduleRequest>,
) -> Json<CommandResponse> {
    *state.schedule.write() = PlaylistSchedule::new(request.periods);
    CommandResponse::ok("Schedule updated")
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);

    let addr = format!("{}:{}", host, port);
    info!("Starting web API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind web API to {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("Web API server error")?;

    Ok(())
}
