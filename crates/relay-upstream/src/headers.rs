//! Upstream header construction for the two surfaces this proxy fronts.
//! Adapted from the provider's own header-building style (config-typed
//! builder functions returning a populated `HeaderMap`), narrowed to the
//! single upstream this proxy targets.

use http::{HeaderMap, HeaderName, HeaderValue};
use relay_accounts::AccountCredentials;

const USER_AGENT: &str = "claude-code/2.1.27";
const BETA_OAUTH: &str = "oauth-2025-04-20";
const BETA_CODE_EXECUTION: &str = "claude-code-20250219";

fn insert(headers: &mut HeaderMap, name: &'static str, value: impl Into<String>) {
    if let Ok(value) = HeaderValue::from_str(&value.into()) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn is_haiku(model: &str) -> bool {
    model.to_ascii_lowercase().contains("haiku")
}

fn beta_header(model: &str) -> String {
    let mut flags = vec![BETA_OAUTH];
    if !is_haiku(model) {
        flags.push(BETA_CODE_EXECUTION);
    }
    flags.join(",")
}

/// Headers for the browser-session surface: client hints, an `Origin`/
/// `Referer` pair matching the web console, and either a bearer token with
/// the capability-flag sum or a session-key cookie, depending on which
/// credential kind the account holds.
pub fn browser_session_headers(web_base: &str, credentials: &AccountCredentials, model: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, "user-agent", USER_AGENT);
    insert(&mut headers, "anthropic-beta", beta_header(model));
    insert(&mut headers, "sec-ch-ua-platform", "\"macOS\"");
    insert(&mut headers, "origin", web_base.to_string());
    insert(&mut headers, "referer", format!("{web_base}/"));

    match credentials {
        AccountCredentials::Oauth { access_token, .. } => {
            insert(&mut headers, "authorization", format!("Bearer {access_token}"));
            insert(&mut headers, "anthropic-client-capabilities", capability_flag_sum());
        }
        AccountCredentials::SessionKey { session_key } => {
            insert(&mut headers, "cookie", format!("sessionKey={session_key}"));
        }
        AccountCredentials::ApiKey { .. } => {}
    }
    headers
}

/// Headers for the first-party API surface: a bearer token (OAuth) or an
/// `x-api-key` header (plain API key), no browser impersonation needed.
pub fn api_headers(credentials: &AccountCredentials, model: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, "anthropic-beta", beta_header(model));
    insert(&mut headers, "content-type", "application/json");

    match credentials {
        AccountCredentials::Oauth { access_token, .. } => {
            insert(&mut headers, "authorization", format!("Bearer {access_token}"));
        }
        AccountCredentials::ApiKey { api_key } => {
            insert(&mut headers, "x-api-key", api_key.clone());
        }
        AccountCredentials::SessionKey { session_key } => {
            insert(&mut headers, "cookie", format!("sessionKey={session_key}"));
        }
    }
    headers
}

/// The sum of the capability bit flags the web console sends; fixed for
/// this proxy since it never negotiates capabilities per-session.
fn capability_flag_sum() -> String {
    "31".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haiku_omits_code_execution_beta_flag() {
        assert_eq!(beta_header("claude-3-5-haiku-20241022"), BETA_OAUTH);
        assert!(beta_header("claude-opus-4-1").contains(BETA_CODE_EXECUTION));
    }

    #[test]
    fn session_key_account_gets_cookie_not_bearer() {
        let creds = AccountCredentials::SessionKey {
            session_key: "sk-abc".to_string(),
        };
        let headers = browser_session_headers("https://claude.ai", &creds, "claude-opus-4-1");
        assert!(headers.get("cookie").is_some());
        assert!(headers.get("authorization").is_none());
    }

    #[test]
    fn api_key_account_uses_x_api_key_header() {
        let creds = AccountCredentials::ApiKey {
            api_key: "ak-1".to_string(),
        };
        let headers = api_headers(&creds, "claude-opus-4-1");
        assert_eq!(headers.get("x-api-key").unwrap(), "ak-1");
    }
}
