//! A single global `wreq::Client`, cached behind a `OnceLock` like the
//! provider it's adapted from. One client per outbound proxy configuration
//! is enough here: both upstream surfaces share the same TLS fingerprint
//! and connection pool, so there is no per-host pool to keep separate.

use std::sync::{Arc, OnceLock};

use wreq::Proxy;

use crate::error::AttemptError;

struct SharedClient {
    proxy: Option<String>,
    client: Arc<wreq::Client>,
}

static SHARED_CLIENT: OnceLock<SharedClient> = OnceLock::new();

pub fn shared_client(proxy: Option<&str>) -> Result<Arc<wreq::Client>, AttemptError> {
    let proxy_owned = proxy.map(|value| value.to_string());
    if let Some(shared) = SHARED_CLIENT.get() {
        if shared.proxy != proxy_owned {
            return Err(AttemptError::Transport(
                "proxy mismatch: only a single global proxy is supported".to_string(),
            ));
        }
        return Ok(shared.client.clone());
    }

    let mut builder = wreq::Client::builder();
    if let Some(proxy_url) = proxy {
        let proxy = Proxy::all(proxy_url).map_err(|err| AttemptError::Transport(err.to_string()))?;
        builder = builder.proxy(proxy);
    }

    let client = builder
        .build()
        .map_err(|err| AttemptError::Transport(err.to_string()))?;
    let shared = SharedClient {
        proxy: proxy_owned,
        client: Arc::new(client),
    };
    let _ = SHARED_CLIENT.set(shared);
    Ok(SHARED_CLIENT
        .get()
        .expect("shared client must be set")
        .client
        .clone())
}
