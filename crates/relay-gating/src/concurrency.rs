//! Per-user and per-account concurrency slot pools. A blocked acquire
//! retries with exponential backoff and jitter rather than parking directly
//! on a semaphore permit, since the caller needs to observe the cumulative
//! wait time and give up once either `wait_timeout` or `max_wait_queue` is
//! exceeded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub enum AcquireError {
    Timeout,
    QueueSaturated,
}

pub struct ConcurrencyConfig {
    pub wait_timeout: Duration,
    pub max_wait_queue: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub backoff_jitter: f64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(30),
            max_wait_queue: 64,
            backoff_base: Duration::from_millis(20),
            backoff_max: Duration::from_millis(500),
            backoff_jitter: 0.2,
        }
    }
}

struct Slot {
    max: u32,
    in_use: AtomicU32,
    waiting: AtomicU32,
}

impl Slot {
    fn new(max: u32) -> Self {
        Self {
            max,
            in_use: AtomicU32::new(0),
            waiting: AtomicU32::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        loop {
            let current = self.in_use.load(Ordering::Acquire);
            if current >= self.max {
                return false;
            }
            if self
                .in_use
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release(&self) {
        self.in_use.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_sub(1))
        }).ok();
    }
}

pub struct Guard {
    pool: Arc<Pool>,
    key: String,
}

impl Drop for Guard {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let key = std::mem::take(&mut self.key);
        tokio::spawn(async move {
            pool.release(&key).await;
        });
    }
}

struct Pool {
    config: ConcurrencyConfig,
    slots: RwLock<HashMap<String, Arc<Slot>>>,
    max_per_key: u32,
}

impl Pool {
    fn new(max_per_key: u32, config: ConcurrencyConfig) -> Self {
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
            max_per_key,
        }
    }

    async fn slot_for(&self, key: &str) -> Arc<Slot> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Slot::new(self.max_per_key)))
            .clone()
    }

    async fn acquire(self: &Arc<Self>, key: &str) -> Result<(Duration, Arc<Slot>), AcquireError> {
        let slot = self.slot_for(key).await;

        if slot.try_acquire() {
            return Ok((Duration::ZERO, slot));
        }

        if slot.waiting.load(Ordering::Acquire) >= self.config.max_wait_queue {
            return Err(AcquireError::QueueSaturated);
        }
        slot.waiting.fetch_add(1, Ordering::AcqRel);
        let _waiting_guard = scopeguard(&slot);

        let started = Instant::now();
        let mut backoff = self.config.backoff_base;
        loop {
            if slot.try_acquire() {
                return Ok((started.elapsed(), slot));
            }
            if started.elapsed() >= self.config.wait_timeout {
                return Err(AcquireError::Timeout);
            }

            let jitter = rand::rng().random_range(
                (1.0 - self.config.backoff_jitter)..(1.0 + self.config.backoff_jitter),
            );
            let sleep_for = backoff.mul_f64(jitter).min(self.config.backoff_max);
            tokio::time::sleep(sleep_for).await;
            backoff = (backoff * 2).min(self.config.backoff_max);
        }
    }

    async fn release(&self, key: &str) {
        if let Some(slot) = self.slots.read().await.get(key) {
            slot.release();
        }
    }
}

fn scopeguard(slot: &Arc<Slot>) -> impl Drop + use<> {
    struct Dec(Arc<Slot>);
    impl Drop for Dec {
        fn drop(&mut self) {
            self.0.waiting.fetch_sub(1, Ordering::AcqRel);
        }
    }
    Dec(slot.clone())
}

pub struct ConcurrencyManager {
    user_pool: Arc<Pool>,
    account_pool: Arc<Pool>,
}

pub struct AcquireOutcome {
    pub wait_time: Duration,
    pub guard: Guard,
}

impl ConcurrencyManager {
    pub fn new(per_user_max: u32, per_account_max: u32, config: ConcurrencyConfig) -> Self {
        Self {
            user_pool: Arc::new(Pool::new(per_user_max, clone_config(&config))),
            account_pool: Arc::new(Pool::new(per_account_max, config)),
        }
    }

    pub async fn acquire_user_slot(&self, user_id: &str) -> Result<AcquireOutcome, AcquireError> {
        let (wait_time, _slot) = self.user_pool.acquire(user_id).await?;
        Ok(AcquireOutcome {
            wait_time,
            guard: Guard {
                pool: self.user_pool.clone(),
                key: user_id.to_string(),
            },
        })
    }

    pub async fn acquire_account_slot(
        &self,
        account_id: &str,
    ) -> Result<AcquireOutcome, AcquireError> {
        let (wait_time, _slot) = self.account_pool.acquire(account_id).await?;
        Ok(AcquireOutcome {
            wait_time,
            guard: Guard {
                pool: self.account_pool.clone(),
                key: account_id.to_string(),
            },
        })
    }
}

fn clone_config(config: &ConcurrencyConfig) -> ConcurrencyConfig {
    ConcurrencyConfig {
        wait_timeout: config.wait_timeout,
        max_wait_queue: config.max_wait_queue,
        backoff_base: config.backoff_base,
        backoff_max: config.backoff_max,
        backoff_jitter: config.backoff_jitter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_and_releases_slot() {
        let manager = ConcurrencyManager::new(1, 1, ConcurrencyConfig::default());
        let outcome = manager.acquire_user_slot("u1").await.expect("should acquire");
        assert_eq!(outcome.wait_time, Duration::ZERO);
        drop(outcome.guard);
    }

    #[tokio::test]
    async fn second_waiter_times_out_when_slot_held() {
        let manager = ConcurrencyManager::new(
            1,
            1,
            ConcurrencyConfig {
                wait_timeout: Duration::from_millis(30),
                backoff_base: Duration::from_millis(5),
                backoff_max: Duration::from_millis(10),
                ..ConcurrencyConfig::default()
            },
        );
        let held = manager.acquire_user_slot("u1").await.expect("first acquire");
        let err = manager.acquire_user_slot("u1").await.unwrap_err();
        assert!(matches!(err, AcquireError::Timeout));
        drop(held.guard);
    }
}
