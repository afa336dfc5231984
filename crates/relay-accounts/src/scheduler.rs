//! Per-request account selection: sticky sessions bound through a passive
//! hash -> account id cache with TTL, falling back to fresh selection among
//! breaker-allowed, eligible candidates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::IndexedRandom;
use relay_common::AccountId;
use relay_gating::CircuitBreaker;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::registry::AccountRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PriorityLru,
    RoundRobin,
    Random,
}

pub struct SchedulerConfig {
    pub strategy: Strategy,
    pub sticky_session_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::PriorityLru,
            sticky_session_ttl: Duration::from_secs(300),
        }
    }
}

pub struct SelectRequest<'a> {
    pub session_hash: Option<&'a str>,
    pub excluded: &'a [AccountId],
}

#[derive(Debug, Clone, Copy)]
pub enum SelectError {
    NoCandidate,
}

struct StickyEntry {
    account_id: AccountId,
    expires_at: Instant,
}

pub struct Scheduler {
    registry: Arc<AccountRegistry>,
    breaker: Arc<CircuitBreaker>,
    config: SchedulerConfig,
    sticky: RwLock<HashMap<String, StickyEntry>>,
    round_robin_cursor: AtomicUsize,
}

impl Scheduler {
    pub fn new(registry: Arc<AccountRegistry>, breaker: Arc<CircuitBreaker>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            breaker,
            config,
            sticky: RwLock::new(HashMap::new()),
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// `session_hash` computation is the caller's responsibility (blake3 of
    /// user id, system prompt, and first user message); the scheduler only
    /// stores and resolves the resulting key.
    pub fn session_hash(user_id: &str, system_prompt: &str, first_message: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(user_id.as_bytes());
        hasher.update(b"\0");
        hasher.update(system_prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(first_message.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub async fn select(&self, request: SelectRequest<'_>) -> Result<AccountId, SelectError> {
        let now = OffsetDateTime::now_utc();

        if let Some(hash) = request.session_hash
            && let Some(account_id) = self.resolve_sticky(hash).await
            && !request.excluded.contains(&account_id)
            && self.breaker.allow(account_id).await
        {
            let account = self.registry.get(account_id).await;
            if account.is_some_and(|account| account.is_eligible(now)) {
                return Ok(account_id);
            }
        }

        let candidates = self.registry.get_schedulable(now).await;
        let mut eligible = Vec::with_capacity(candidates.len());
        for account in candidates {
            if request.excluded.contains(&account.id) {
                continue;
            }
            if self.breaker.allow(account.id).await {
                eligible.push(account.id);
            }
        }

        let chosen = self.pick(&eligible).ok_or(SelectError::NoCandidate)?;

        if let Some(hash) = request.session_hash {
            self.bind_sticky(hash, chosen).await;
        }

        Ok(chosen)
    }

    fn pick(&self, candidates: &[AccountId]) -> Option<AccountId> {
        if candidates.is_empty() {
            return None;
        }
        match self.config.strategy {
            // Candidates already arrive priority-then-last_used_at sorted
            // from `get_schedulable`.
            Strategy::PriorityLru => candidates.first().copied(),
            Strategy::RoundRobin => {
                let index = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
                candidates.get(index).copied()
            }
            Strategy::Random => candidates.choose(&mut rand::rng()).copied(),
        }
    }

    async fn resolve_sticky(&self, hash: &str) -> Option<AccountId> {
        let sticky = self.sticky.read().await;
        let entry = sticky.get(hash)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.account_id)
    }

    async fn bind_sticky(&self, hash: &str, account_id: AccountId) {
        self.sticky.write().await.insert(
            hash.to_string(),
            StickyEntry {
                account_id,
                expires_at: Instant::now() + self.config.sticky_session_ttl,
            },
        );
    }
}
