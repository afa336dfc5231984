//! OAuth token refresh for accounts holding `AccountCredentials::Oauth`.
//! Triggered proactively inside the refresh window rather than waiting for
//! an upstream 401, and a failed refresh does not itself fail the in-flight
//! request: the caller falls through to the attempt with whatever token it
//! already had, and the attempt fails on its own if the token really is
//! dead.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::OffsetDateTime;

const REFRESH_ENDPOINT: &str = "https://console.anthropic.com/v1/oauth/token";
const CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";

/// Proactive refresh window: refresh once the token has less than this long
/// left, so a slow refresh doesn't race an in-flight request's own expiry.
pub const REFRESH_BEFORE: Duration = Duration::from_secs(180);

pub fn needs_refresh(expires_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    expires_at - now <= time::Duration::seconds(REFRESH_BEFORE.as_secs() as i64)
}

#[derive(Debug)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh rejected by upstream: {status}")]
    Rejected { status: u16 },
}

pub async fn refresh(client: &Arc<wreq::Client>, refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
    let body = serde_json::json!({
        "grant_type": "refresh_token",
        "refresh_token": refresh_token,
        "client_id": CLIENT_ID,
    });

    let response = client
        .post(REFRESH_ENDPOINT)
        .json(&body)
        .send()
        .await
        .map_err(|err| RefreshError::Transport(err.to_string()))?;

    let status = response.status().as_u16();
    if status >= 400 {
        return Err(RefreshError::Rejected { status });
    }

    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|err| RefreshError::Transport(err.to_string()))?;

    Ok(RefreshedTokens {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token,
        expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(parsed.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_refresh_inside_window() {
        let now = OffsetDateTime::UNIX_EPOCH;
        assert!(needs_refresh(now + time::Duration::seconds(60), now));
        assert!(!needs_refresh(now + time::Duration::seconds(600), now));
    }
}
