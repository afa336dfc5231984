//! `Execute(ctx, select, operate)`: the retry/failure state machine that
//! sits between the scheduler and a single upstream attempt. `select`
//! re-runs account selection on every attempt (excluding accounts already
//! tried this request); `operate` performs one idempotent upstream attempt
//! against whichever account `select` returned.

use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;
use relay_accounts::{AccountRegistry, Scheduler, SelectError, SelectRequest};
use relay_common::{AccountId, RelayError};
use relay_gating::CircuitBreaker;
use time::OffsetDateTime;

use crate::error::AttemptError;
use crate::transport::UpstreamResponse;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

fn backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config.initial_backoff.saturating_mul(1u32 << attempt.saturating_sub(1).min(20));
    let capped = exp.min(config.max_backoff);
    let jitter_ms = rand::rng().random_range(0..=(capped.as_millis() as u64 / 4).max(1));
    capped + Duration::from_millis(jitter_ms)
}

/// Runs one request to completion, retrying a 503 (overload) against a
/// different account and surfacing everything else. `operate` must be
/// idempotent: it may be invoked more than once for the same logical
/// request.
pub async fn execute<Operate>(
    config: &RetryConfig,
    scheduler: &Scheduler,
    registry: &AccountRegistry,
    breaker: &CircuitBreaker,
    session_hash: Option<&str>,
    mut operate: Operate,
) -> Result<UpstreamResponse, RelayError>
where
    Operate: for<'a> FnMut(AccountId) -> BoxFuture<'a, Result<UpstreamResponse, AttemptError>>,
{
    let mut excluded: Vec<AccountId> = Vec::new();
    let mut attempts = 0u32;

    loop {
        let account_id = scheduler
            .select(SelectRequest {
                session_hash,
                excluded: &excluded,
            })
            .await
            .map_err(|SelectError::NoCandidate| RelayError::NoAccountAvailable)?;

        let result = operate(account_id).await;
        attempts += 1;

        match result {
            Ok(response) if response.status < 400 => {
                breaker.record_success(account_id).await;
                return Ok(response);
            }
            Ok(response) if response.status == 503 && attempts < config.max_attempts => {
                breaker.record_failure(account_id).await;
                let overload_until = OffsetDateTime::now_utc() + time::Duration::seconds(10);
                let _ = registry.set_overload(account_id, overload_until).await;
                excluded.push(account_id);
                tokio::time::sleep(backoff(config, attempts)).await;
                continue;
            }
            Ok(response) => {
                breaker.record_failure(account_id).await;
                let status = response.status;
                let body = response.collect_body().await.unwrap_or_default();
                return Err(RelayError::UpstreamStatus { status, body });
            }
            Err(err) => {
                breaker.record_failure(account_id).await;
                return Err(RelayError::from(err));
            }
        }
    }
}
