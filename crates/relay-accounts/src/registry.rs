//! The account registry: an in-memory cache of account records fronting the
//! durable store, following the same `RwLock<HashMap<id, T>>` shape as the
//! credential pool this is adapted from. The store (outside this crate)
//! remains the durable owner; the registry is the structure the scheduler
//! and retry executor read and mutate on the request path.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use relay_common::{AccountId, AccountKind, AccountStatus, HealthStatus};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountCredentials {
    Oauth {
        access_token: String,
        refresh_token: String,
        expires_at: OffsetDateTime,
    },
    SessionKey {
        session_key: String,
    },
    ApiKey {
        api_key: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    pub organization_id: Option<String>,
    pub credentials: AccountCredentials,

    pub status: AccountStatus,
    pub schedulable: bool,
    pub priority: i32,
    pub max_concurrency: u32,

    pub rate_limit_reset_at: Option<OffsetDateTime>,
    pub overload_until: Option<OffsetDateTime>,
    pub temp_unschedulable_until: Option<OffsetDateTime>,
    pub temp_unschedulable_reason: Option<String>,

    pub health_status: HealthStatus,
    pub last_check_at: Option<OffsetDateTime>,
    pub error_count: u64,
    pub success_count: u64,
    pub error_message: Option<String>,

    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
}

impl Account {
    /// The derived eligibility predicate from the data model: `schedulable`
    /// narrows but the derived check is authoritative. Crossing a transient
    /// gating timestamp restores eligibility without any writer touching
    /// the record.
    pub fn is_eligible(&self, now: OffsetDateTime) -> bool {
        if self.status != AccountStatus::Active || !self.schedulable {
            return false;
        }
        if let AccountCredentials::Oauth { expires_at, .. } = &self.credentials
            && *expires_at <= now
        {
            return false;
        }
        [
            self.rate_limit_reset_at,
            self.overload_until,
            self.temp_unschedulable_until,
        ]
        .into_iter()
        .flatten()
        .all(|until| now >= until)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RegistryError {
    NotFound,
}

pub struct AccountRegistry {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl AccountRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            accounts: RwLock::new(HashMap::new()),
        })
    }

    pub async fn create(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }

    pub async fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<Account> {
        self.accounts.read().await.values().cloned().collect()
    }

    pub async fn update(
        &self,
        id: AccountId,
        patch: impl FnOnce(&mut Account),
    ) -> Result<(), RegistryError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(RegistryError::NotFound)?;
        patch(account);
        Ok(())
    }

    pub async fn delete(&self, id: AccountId) {
        self.accounts.write().await.remove(&id);
    }

    pub async fn deactivate(&self, id: AccountId) -> Result<(), RegistryError> {
        self.update(id, |account| account.schedulable = false).await
    }

    pub async fn update_last_used(&self, id: AccountId, at: OffsetDateTime) -> Result<(), RegistryError> {
        self.update(id, |account| account.last_used_at = Some(at)).await
    }

    pub async fn increment_error(&self, id: AccountId) -> Result<(), RegistryError> {
        self.update(id, |account| account.error_count += 1).await
    }

    pub async fn increment_success(&self, id: AccountId) -> Result<(), RegistryError> {
        self.update(id, |account| account.success_count += 1).await
    }

    pub async fn update_health(&self, id: AccountId, status: HealthStatus, at: OffsetDateTime) -> Result<(), RegistryError> {
        self.update(id, |account| {
            account.health_status = status;
            account.last_check_at = Some(at);
        })
        .await
    }

    pub async fn set_rate_limit(
        &self,
        id: AccountId,
        reset_at: OffsetDateTime,
    ) -> Result<(), RegistryError> {
        self.update(id, |account| account.rate_limit_reset_at = Some(reset_at)).await
    }

    pub async fn set_overload(&self, id: AccountId, until: OffsetDateTime) -> Result<(), RegistryError> {
        self.update(id, |account| account.overload_until = Some(until)).await
    }

    pub async fn set_temp_unschedulable(
        &self,
        id: AccountId,
        until: OffsetDateTime,
        reason: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let reason = reason.into();
        self.update(id, |account| {
            account.temp_unschedulable_until = Some(until);
            account.temp_unschedulable_reason = Some(reason);
        })
        .await
    }

    pub async fn clear_temp_flags(&self, id: AccountId) -> Result<(), RegistryError> {
        self.update(id, |account| {
            account.rate_limit_reset_at = None;
            account.overload_until = None;
            account.temp_unschedulable_until = None;
            account.temp_unschedulable_reason = None;
        })
        .await
    }

    pub async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
        message: Option<String>,
    ) -> Result<(), RegistryError> {
        self.update(id, |account| {
            account.status = status;
            account.error_message = message;
        })
        .await
    }

    /// Accounts satisfying the derived eligibility predicate, ordered by
    /// `priority` ascending then `last_used_at` ascending with nulls first.
    pub async fn get_schedulable(&self, now: OffsetDateTime) -> Vec<Account> {
        let mut rows: Vec<Account> = self
            .accounts
            .read()
            .await
            .values()
            .filter(|account| account.is_eligible(now))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| match (a.last_used_at, b.last_used_at) {
                    (None, None) => std::cmp::Ordering::Equal,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (Some(a), Some(b)) => a.cmp(&b),
                })
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: AccountId, priority: i32) -> Account {
        Account {
            id,
            name: format!("acct-{id}"),
            kind: AccountKind::ApiKey,
            organization_id: None,
            credentials: AccountCredentials::ApiKey {
                api_key: "key".to_string(),
            },
            status: AccountStatus::Active,
            schedulable: true,
            priority,
            max_concurrency: 4,
            rate_limit_reset_at: None,
            overload_until: None,
            temp_unschedulable_until: None,
            temp_unschedulable_reason: None,
            health_status: HealthStatus::Healthy,
            last_check_at: None,
            error_count: 0,
            success_count: 0,
            error_message: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn schedulable_orders_by_priority_then_last_used() {
        let registry = AccountRegistry::new();
        registry.create(account(1, 2)).await;
        registry.create(account(2, 1)).await;
        registry.create(account(3, 1)).await;
        registry
            .update(3, |account| {
                account.last_used_at = Some(OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(10))
            })
            .await
            .unwrap();

        let rows = registry.get_schedulable(OffsetDateTime::now_utc()).await;
        let ids: Vec<_> = rows.iter().map(|account| account.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn rate_limited_account_excluded_until_reset() {
        let registry = AccountRegistry::new();
        registry.create(account(1, 1)).await;
        let now = OffsetDateTime::now_utc();
        registry
            .set_rate_limit(1, now + time::Duration::seconds(30))
            .await
            .unwrap();

        assert!(registry.get_schedulable(now).await.is_empty());
        assert_eq!(
            registry
                .get_schedulable(now + time::Duration::seconds(31))
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn status_error_is_not_auto_cleared_by_time() {
        let registry = AccountRegistry::new();
        registry.create(account(1, 1)).await;
        registry
            .set_status(1, AccountStatus::Error, Some("boom".to_string()))
            .await
            .unwrap();

        let far_future = OffsetDateTime::now_utc() + time::Duration::days(1);
        assert!(registry.get_schedulable(far_future).await.is_empty());
    }
}
