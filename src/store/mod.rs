//! The persistent, transactional store (spec §2 "Store").
//!
//! All entities are rows in Postgres, keyed by UUID (spec §6
//! "Persistence"). Secondary indexes on `(business_id, status)`,
//! `(helper_id, status)`, `(helper_id, position)` and `(joining_time)`
//! live in the migrations under `migrations/`.

pub mod business;
pub mod error;
pub mod helper_wait_times;
pub mod lock;
pub mod manual_customer;
pub mod models;
pub mod queue_entry;
pub mod registered_user;
pub mod service;

pub use error::StoreError;
pub use lock::BusinessLocks;
pub use models::*;

use sqlx::{PgPool, Postgres, Transaction};

use crate::common::BusinessId;

/// Thin handle around the connection pool plus the per-business mutex
/// registry. Cloned freely (both fields are `Arc`-backed).
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    locks: BusinessLocks,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            locks: BusinessLocks::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Acquires the per-business mutex and opens a transaction. Callers must
    /// hold the returned guard for the lifetime of the transaction — it is
    /// released only when the guard itself is dropped, after `commit()`
    /// or `rollback()` (spec §5).
    pub async fn begin_for_business(
        &self,
        business_id: BusinessId,
    ) -> Result<(tokio::sync::OwnedMutexGuard<()>, Transaction<'static, Postgres>), StoreError>
    {
        let guard = self.locks.acquire(business_id).await;
        let tx = self.pool.begin().await?;
        Ok((guard, tx))
    }
}
