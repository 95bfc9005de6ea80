//! Store and transaction boundary

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use sqlx::AnyPool;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, warn};

use super::error::{LedgerError, LedgerResult};
use super::repository::{Queries, TxQueries};
use crate::db::Database;

/// Entry point to the ledger: pooled accessors plus atomic scopes
#[derive(Clone, Debug)]
pub struct Store {
    pool: AnyPool,
}

impl Store {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Pooled repository; each call is its own statement outside any scope
    pub fn queries(&self) -> Queries {
        Queries::new(self.pool.clone())
    }

    /// Run `op` inside one database transaction.
    ///
    /// Commits when `op` returns `Ok`. When it returns `Err` the transaction is
    /// rolled back and the cause comes back wrapped in [`LedgerError::Aborted`];
    /// a failed rollback is logged and never replaces the cause. A panic in `op`
    /// rolls back before the panic continues. If the returned future is dropped
    /// before completion the open transaction is dropped with it, which rolls back.
    ///
    /// `op` only ever sees a [`TxQueries`], which has no way to open another scope.
    pub async fn run_atomic<T, F>(&self, op: F) -> LedgerResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TxQueries) -> BoxFuture<'c, LedgerResult<T>> + Send,
    {
        self.run_scope(None, op).await
    }

    /// [`run_atomic`](Self::run_atomic) with `deadline` bounding both the wait
    /// for a transaction and `op` itself.
    ///
    /// Expiry before `op` finishes rolls back and reports
    /// [`LedgerError::DeadlineExceeded`] (wrapped in `Aborted` once the scope is
    /// open). The commit is not bounded: once `op` has succeeded the commit runs
    /// to completion, so `DeadlineExceeded` always means nothing was written.
    pub async fn run_atomic_until<T, F>(&self, deadline: Instant, op: F) -> LedgerResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TxQueries) -> BoxFuture<'c, LedgerResult<T>> + Send,
    {
        self.run_scope(Some(deadline), op).await
    }

    async fn run_scope<T, F>(&self, deadline: Option<Instant>, op: F) -> LedgerResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TxQueries) -> BoxFuture<'c, LedgerResult<T>> + Send,
    {
        let begun = match deadline {
            Some(at) => timeout_at(at, self.pool.begin())
                .await
                .map_err(|_| LedgerError::DeadlineExceeded)?,
            None => self.pool.begin().await,
        };
        let tx = begun.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            LedgerError::from(e)
        })?;
        let mut scope = TxQueries::new(tx);

        let body = AssertUnwindSafe(op(&mut scope)).catch_unwind();
        let outcome = match deadline {
            Some(at) => timeout_at(at, body)
                .await
                .unwrap_or(Ok(Err(LedgerError::DeadlineExceeded))),
            None => body.await,
        };

        match outcome {
            Ok(Ok(value)) => {
                scope.commit().await?;
                debug!("Transaction committed");
                Ok(value)
            }
            Ok(Err(cause)) => {
                warn!(error = %cause, "Transaction failed, rolling back");
                if let Err(rb_err) = scope.rollback().await {
                    error!(error = %rb_err, cause = %cause, "Failed to roll back transaction");
                }
                Err(LedgerError::Aborted(Box::new(cause)))
            }
            Err(panic) => {
                error!("Transaction body panicked, rolling back");
                if let Err(rb_err) = scope.rollback().await {
                    error!(error = %rb_err, "Failed to roll back transaction");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}
