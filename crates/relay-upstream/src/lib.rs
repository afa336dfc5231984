//! The upstream transport layer: builds and sends requests against the
//! browser-session and first-party API surfaces, refreshes OAuth
//! credentials proactively, and runs the retry/failure state machine that
//! ties a request to the account scheduler.

pub mod client;
pub mod error;
pub mod headers;
pub mod oauth;
pub mod retry;
pub mod transport;

pub use client::shared_client;
pub use error::AttemptError;
pub use retry::{RetryConfig, execute};
pub use transport::{Surface, UpstreamResponse, UpstreamTarget, send};
