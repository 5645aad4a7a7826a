//! Transaction manager: the sole entry point mutating repository operations accept.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::debug;

/// Errors raised by the transaction manager.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Wraps a `sqlx::Transaction<'static, Postgres>`, the sole handle mutating repository
/// operations accept. Obtained from [`TransactionManager::begin`].
pub struct Tx(Transaction<'static, Postgres>);

impl Tx {
    /// Commit the transaction. Consumes `self` — a committed `Tx` cannot be reused.
    pub async fn commit(self) -> StoreResult<()> {
        self.0.commit().await.map_err(StoreError::StoreUnavailable)
    }

    /// Roll back the transaction. Safe to call on every non-commit exit path; rollback
    /// is idempotent from the caller's perspective since `Tx` cannot be reused after.
    pub async fn rollback(self) -> StoreResult<()> {
        self.0
            .rollback()
            .await
            .map_err(StoreError::StoreUnavailable)
    }
}

impl Deref for Tx {
    type Target = Transaction<'static, Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Issues transactions with a per-transaction row-lock acquisition timeout installed,
/// so a hung bidder cannot wedge a row indefinitely (spec §4.1).
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
    lock_timeout: Duration,
}

impl TransactionManager {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Begin a transaction and install `SET LOCAL lock_timeout`, so every
    /// `SELECT ... FOR UPDATE` issued on this `Tx` is bounded by `lock_timeout` without
    /// call sites repeating the SQL.
    pub async fn begin(&self) -> StoreResult<Tx> {
        let mut tx = self.pool.begin().await?;

        let lock_timeout_ms = self.lock_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL lock_timeout = '{lock_timeout_ms}ms'"))
            .execute(&mut *tx)
            .await?;

        debug!(lock_timeout_ms, "transaction started");
        Ok(Tx(tx))
    }
}

impl From<StoreError> for sqlx::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StoreUnavailable(e) => e,
        }
    }
}
