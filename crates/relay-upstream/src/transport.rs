//! The two upstream surfaces this proxy fronts: the browser-session API
//! (impersonating the web console) and the first-party API. Both send the
//! same native message request body; they differ only in base URL, header
//! shape, and how the SSE stream comes back.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::Stream;
use relay_accounts::AccountCredentials;
use serde_json::Value;

use crate::error::AttemptError;
use crate::headers::{api_headers, browser_session_headers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    BrowserSession,
    Api,
}

pub struct UpstreamTarget {
    pub surface: Surface,
    pub base_url: String,
}

impl UpstreamTarget {
    fn messages_url(&self) -> String {
        match self.surface {
            Surface::BrowserSession => format!("{}/api/append_message", self.base_url),
            Surface::Api => format!("{}/v1/messages", self.base_url),
        }
    }
}

pub struct UpstreamResponse {
    pub status: u16,
    pub headers: http::HeaderMap,
    pub body_stream: Box<dyn Stream<Item = reqwest_like::Result<Bytes>> + Send + Unpin>,
}

impl UpstreamResponse {
    /// Drains the remaining stream into a single buffer; used for the
    /// non-2xx path where the retry executor needs the whole error body to
    /// classify and surface, not a chunk-by-chunk SSE read.
    pub async fn collect_body(self) -> Result<Bytes, AttemptError> {
        use futures_util::StreamExt;
        let mut stream = self.body_stream;
        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk.map_err(|err| AttemptError::Transport(err.to_string()))?);
        }
        Ok(buf.freeze())
    }
}

/// `wreq`'s byte-stream error type, aliased so this module doesn't leak
/// `wreq` beyond its own signature.
mod reqwest_like {
    pub type Result<T> = std::result::Result<T, wreq::Error>;
}

pub async fn send(
    client: &Arc<wreq::Client>,
    target: &UpstreamTarget,
    credentials: &AccountCredentials,
    model: &str,
    body: &Value,
) -> Result<UpstreamResponse, AttemptError> {
    let headers = match target.surface {
        Surface::BrowserSession => browser_session_headers(&target.base_url, credentials, model),
        Surface::Api => api_headers(credentials, model),
    };

    let response = client
        .post(target.messages_url())
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|err| AttemptError::Transport(err.to_string()))?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body_stream = Box::new(response.bytes_stream());

    Ok(UpstreamResponse {
        status,
        headers,
        body_stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_session_and_api_targets_hit_different_paths() {
        let browser = UpstreamTarget {
            surface: Surface::BrowserSession,
            base_url: "https://claude.ai".to_string(),
        };
        let api = UpstreamTarget {
            surface: Surface::Api,
            base_url: "https://api.anthropic.com".to_string(),
        };
        assert!(browser.messages_url().contains("claude.ai"));
        assert!(api.messages_url().ends_with("/v1/messages"));
    }
}
