//! The gating substrate that feeds the scheduler: a per-account circuit
//! breaker, a four-scope rate limiter, and a two-pool concurrency manager.
//! All three are independent in-memory services keyed on identity; none of
//! them persist anything, matching the spec's "transient and may be dropped
//! on restart" ownership rule for this layer.

pub mod breaker;
pub mod concurrency;
pub mod rate_limit;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use concurrency::{AcquireError as ConcurrencyAcquireError, ConcurrencyConfig, ConcurrencyManager};
pub use rate_limit::{CheckAllOutcome, RateLimitRule, RateLimiter, RateLimiterConfig};
