//! Shared primitives used across the workspace: id newtypes and the
//! top-level error enum every crate boundary converts into.

use serde::{Deserialize, Serialize};

pub type AccountId = i64;
pub type TokenId = i64;

/// Errors that can cross a crate boundary inside the proxy core.
///
/// HTTP-facing code converts this into the synthesized JSON error envelope;
/// everything else just propagates it with `?`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("rate limited, retry at {retry_at}")]
    RateLimited { retry_at: time::OffsetDateTime },
    #[error("too many concurrent requests")]
    TooManyConcurrent,
    #[error("no account available")]
    NoAccountAvailable,
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, body: bytes::Bytes },
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("request canceled")]
    Canceled,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("record not found")]
    NotFound,
}

/// Account lifecycle status. Crossing `error` requires explicit intervention
/// (human admin action or a successful OAuth refresh); it never auto-clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Error,
    Disabled,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Oauth,
    SessionKey,
    ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    Web,
    Api,
    Both,
}

impl TokenMode {
    pub fn allows(self, requested: TokenMode) -> bool {
        matches!(self, TokenMode::Both) || self == requested
    }
}
