//! Access-token lifecycle
//!
//! Non-interactive refresh-token grant. The interactive authorization flow
//! that produced the refresh token happens elsewhere; at runtime we only ever
//! exchange it for short-lived access tokens and cache them until shortly
//! before expiry.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::SpotifyError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Exchanges a refresh token for cached access tokens
pub struct TokenSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    // tokio Mutex: held across the refresh await to serialize refreshes
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    ) -> Self {
        Self::with_token_url(http, client_id, client_secret, refresh_token, TOKEN_URL)
    }

    /// Same as [`new`](Self::new) with an overridable token endpoint
    pub fn with_token_url(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id,
            client_secret,
            refresh_token,
            cached: Mutex::new(None),
        }
    }

    /// A valid access token, refreshing if the cached one is stale
    pub async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Refreshing Spotify access token");
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(format!(
                "token refresh returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(access_token)
    }
}
