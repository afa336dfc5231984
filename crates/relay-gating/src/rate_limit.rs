//! Four independent fixed-window rate-limit scopes: user, account, ip,
//! global. Each scope tracks a window start and a count; the window resets
//! lazily the next time it's checked, same lazy-recovery idea as the
//! breaker's open-timeout transition.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

pub struct Outcome {
    pub allowed: bool,
    pub retry_at: Option<Instant>,
}

struct Scope {
    rule: RateLimitRule,
    windows: RwLock<HashMap<String, Window>>,
}

impl Scope {
    fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            windows: RwLock::new(HashMap::new()),
        }
    }

    async fn check_and_count(&self, key: &str) -> Outcome {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(window.started_at) >= self.rule.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count < self.rule.requests {
            window.count += 1;
            Outcome {
                allowed: true,
                retry_at: None,
            }
        } else {
            Outcome {
                allowed: false,
                retry_at: Some(window.started_at + self.rule.window),
            }
        }
    }
}

pub struct RateLimiterConfig {
    pub enabled: bool,
    pub user: RateLimitRule,
    pub account: RateLimitRule,
    pub ip: RateLimitRule,
    pub global: RateLimitRule,
}

pub struct RateLimiter {
    enabled: bool,
    user: Scope,
    account: Scope,
    ip: Scope,
    global: Scope,
}

pub struct CheckAllOutcome {
    pub allowed: bool,
    pub retry_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            enabled: config.enabled,
            user: Scope::new(config.user),
            account: Scope::new(config.account),
            ip: Scope::new(config.ip),
            global: Scope::new(config.global),
        }
    }

    /// Checks and, for scopes that pass, counts the request against all four
    /// scopes. A request that fails any scope still counts against the
    /// scopes that passed — matching the teacher's `insert-then-reject`
    /// style bookkeeping in the credential pool rather than pre-checking
    /// every scope before touching state.
    pub async fn check_all(&self, user: &str, account: &str, ip: &str) -> CheckAllOutcome {
        if !self.enabled {
            return CheckAllOutcome {
                allowed: true,
                retry_at: None,
            };
        }

        let results = [
            self.user.check_and_count(user).await,
            self.account.check_and_count(account).await,
            self.ip.check_and_count(ip).await,
            self.global.check_and_count("global").await,
        ];

        let retry_at = results
            .iter()
            .filter(|outcome| !outcome.allowed)
            .filter_map(|outcome| outcome.retry_at)
            .min();

        CheckAllOutcome {
            allowed: retry_at.is_none(),
            retry_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(requests: u32) -> RateLimitRule {
        RateLimitRule {
            requests,
            window: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn blocks_after_limit_reached() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            enabled: true,
            user: rule(1),
            account: rule(100),
            ip: rule(100),
            global: rule(100),
        });

        let first = limiter.check_all("u1", "a1", "ip1").await;
        assert!(first.allowed);
        let second = limiter.check_all("u1", "a1", "ip1").await;
        assert!(!second.allowed);
        assert!(second.retry_at.is_some());
    }

    #[tokio::test]
    async fn disabled_always_allows() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            enabled: false,
            user: rule(0),
            account: rule(0),
            ip: rule(0),
            global: rule(0),
        });

        assert!(limiter.check_all("u1", "a1", "ip1").await.allowed);
    }
}
