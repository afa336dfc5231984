//! Per-account circuit breaker: closed/open/half-open, lazily transitioned
//! on `allow()` the way the credential pool lazily recovers unavailable
//! credentials rather than running a background sweep.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use relay_common::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
        }
    }
}

pub struct BreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
        }
    }
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    accounts: RwLock<HashMap<AccountId, Counters>>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Lazily advances `open -> half-open` if `open_timeout` has elapsed,
    /// then reports whether a request through this account may proceed.
    pub async fn allow(&self, account_id: AccountId) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut accounts = self.accounts.write().await;
        let counters = accounts.entry(account_id).or_default();

        if let State::Open { opened_at } = counters.state
            && opened_at.elapsed() >= self.config.open_timeout
        {
            counters.state = State::HalfOpen;
            counters.consecutive_successes = 0;
        }

        !matches!(counters.state, State::Open { .. })
    }

    pub async fn record_success(&self, account_id: AccountId) {
        if !self.config.enabled {
            return;
        }

        let mut accounts = self.accounts.write().await;
        let counters = accounts.entry(account_id).or_default();
        counters.consecutive_failures = 0;

        match counters.state {
            State::HalfOpen => {
                counters.consecutive_successes += 1;
                if counters.consecutive_successes >= self.config.success_threshold {
                    counters.state = State::Closed;
                    counters.consecutive_successes = 0;
                }
            }
            State::Closed | State::Open { .. } => {
                counters.consecutive_successes = 0;
            }
        }
    }

    pub async fn record_failure(&self, account_id: AccountId) {
        if !self.config.enabled {
            return;
        }

        let mut accounts = self.accounts.write().await;
        let counters = accounts.entry(account_id).or_default();
        counters.consecutive_successes = 0;

        match counters.state {
            State::HalfOpen => {
                counters.state = State::Open {
                    opened_at: Instant::now(),
                };
                counters.consecutive_failures = 0;
            }
            State::Closed => {
                counters.consecutive_failures += 1;
                if counters.consecutive_failures >= self.config.failure_threshold {
                    counters.state = State::Open {
                        opened_at: Instant::now(),
                    };
                    counters.consecutive_failures = 0;
                }
            }
            State::Open { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 2,
            ..BreakerConfig::default()
        });

        assert!(breaker.allow(1).await);
        breaker.record_failure(1).await;
        assert!(breaker.allow(1).await);
        breaker.record_failure(1).await;
        assert!(!breaker.allow(1).await);
    }

    #[tokio::test]
    async fn half_open_reopens_on_any_failure() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 1,
            success_threshold: 2,
            open_timeout: Duration::from_millis(1),
            ..BreakerConfig::default()
        });

        breaker.record_failure(1).await;
        assert!(!breaker.allow(1).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(breaker.allow(1).await); // transitions to half-open

        breaker.record_failure(1).await;
        assert!(!breaker.allow(1).await);
    }

    #[tokio::test]
    async fn disabled_breaker_always_allows() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            enabled: false,
            failure_threshold: 1,
            ..BreakerConfig::default()
        });

        breaker.record_failure(1).await;
        assert!(breaker.allow(1).await);
    }
}
