//! Transfer execution
//!
//! One transfer is one atomic scope:
//!
//! ```text
//! validate ─▶ BEGIN ─▶ transfer row ─▶ debit entry ─▶ credit entry
//!                 ─▶ balance(min id) ─▶ balance(max id) ─▶ policies ─▶ COMMIT
//! ```
//!
//! Any failure after BEGIN rolls everything back. Balances are always adjusted
//! in ascending account-id order, so two transfers on the same pair of accounts
//! in opposite directions lock the rows in the same order and cannot deadlock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::balance::adjust_pair_ordered;
use super::error::{LedgerError, LedgerResult};
use super::models::{CreateEntryParams, CreateTransferParams, TransferTxParams, TransferTxResult};
use super::policy::{RejectOverdraft, RequireSameCurrency, TransferPolicy};
use super::repository::ScopedLedger;
use super::store::Store;
use crate::config::TransferConfig;

/// Runs transfers against a [`Store`]
#[derive(Clone)]
pub struct TransferExecutor {
    store: Store,
    policies: Vec<Arc<dyn TransferPolicy>>,
}

impl TransferExecutor {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            policies: Vec::new(),
        }
    }

    /// Executor with the policies switched on in `config`
    pub fn from_config(store: Store, config: &TransferConfig) -> Self {
        let mut executor = Self::new(store);
        if config.reject_overdraft {
            executor = executor.with_policy(RejectOverdraft);
        }
        if config.require_same_currency {
            executor = executor.with_policy(RequireSameCurrency);
        }
        executor
    }

    pub fn with_policy(mut self, policy: impl TransferPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Move `params.amount` from one account to another.
    ///
    /// Errors come back as their root kind: validation errors before any
    /// transaction is opened, `AccountNotFound`, `Conflict`, policy errors, or
    /// `Database` for anything else. Nothing is persisted on error.
    pub async fn transfer(&self, params: TransferTxParams) -> LedgerResult<TransferTxResult> {
        self.execute(params, None).await
    }

    /// [`transfer`](Self::transfer) bounded by `deadline`.
    ///
    /// The deadline covers waiting for a transaction and the writes, not the
    /// commit. On expiry the scope is rolled back and `DeadlineExceeded` is
    /// returned, so that error always means the transfer did not happen and is
    /// safe to retry. A transfer whose commit has started is allowed to finish
    /// and reports success even if that runs past the deadline.
    pub async fn transfer_with_deadline(
        &self,
        params: TransferTxParams,
        deadline: Duration,
    ) -> LedgerResult<TransferTxResult> {
        let result = self.execute(params, Some(Instant::now() + deadline)).await;
        if matches!(result, Err(LedgerError::DeadlineExceeded)) {
            warn!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                deadline_ms = deadline.as_millis() as u64,
                "Transfer deadline exceeded"
            );
        }
        result
    }

    async fn execute(
        &self,
        params: TransferTxParams,
        deadline: Option<Instant>,
    ) -> LedgerResult<TransferTxResult> {
        if let Err(e) = params.validate() {
            debug!(
                from_account_id = params.from_account_id,
                to_account_id = params.to_account_id,
                amount = params.amount,
                error = %e,
                "Transfer rejected"
            );
            return Err(e);
        }

        let policies = self.policies.clone();
        let outcome = match deadline {
            Some(at) => {
                self.store
                    .run_atomic_until(at, move |scope| {
                        Box::pin(execute_checked(scope, params, policies))
                    })
                    .await
            }
            None => {
                self.store
                    .run_atomic(move |scope| Box::pin(execute_checked(scope, params, policies)))
                    .await
            }
        };

        match outcome {
            Ok(result) => {
                info!(
                    transfer_id = result.transfer.id,
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    amount = params.amount,
                    "Transfer committed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    amount = params.amount,
                    error = %e,
                    "Transfer failed"
                );
                Err(e.into_cause())
            }
        }
    }

    /// [`transfer`](Self::transfer) abandoned as soon as `cancel` resolves.
    ///
    /// A transfer that has already committed is reported as such even if
    /// `cancel` is ready at the same time. Cancelling while the commit is in
    /// flight leaves the outcome unknown to the caller: the commit may still
    /// land. Use [`transfer_with_deadline`](Self::transfer_with_deadline) when
    /// a failed transfer must be safe to retry.
    pub async fn transfer_until<C>(
        &self,
        params: TransferTxParams,
        cancel: C,
    ) -> LedgerResult<TransferTxResult>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.transfer(params) => result,
            _ = cancel => {
                warn!(
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    "Transfer cancelled"
                );
                Err(LedgerError::Cancelled)
            }
        }
    }
}

async fn execute_checked<S>(
    scope: &mut S,
    params: TransferTxParams,
    policies: Vec<Arc<dyn TransferPolicy>>,
) -> LedgerResult<TransferTxResult>
where
    S: ScopedLedger + ?Sized,
{
    let result = execute_transfer(scope, &params).await?;
    for policy in &policies {
        if let Err(e) = policy.check(&result) {
            debug!(policy = policy.name(), error = %e, "Transfer rejected by policy");
            return Err(e);
        }
    }
    Ok(result)
}

/// The body of a transfer, run against an already open scope.
///
/// Writes the transfer row, the debit and credit entries, then adjusts both
/// balances lower account id first. Does not validate `params`.
pub async fn execute_transfer<S>(scope: &mut S, params: &TransferTxParams) -> LedgerResult<TransferTxResult>
where
    S: ScopedLedger + ?Sized,
{
    let transfer = scope
        .create_transfer(CreateTransferParams {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
        })
        .await?;
    debug!(transfer_id = transfer.id, "Transfer record created");

    let from_entry = scope
        .create_entry(CreateEntryParams {
            account_id: params.from_account_id,
            amount: -params.amount,
        })
        .await?;

    let to_entry = scope
        .create_entry(CreateEntryParams {
            account_id: params.to_account_id,
            amount: params.amount,
        })
        .await?;
    debug!(
        transfer_id = transfer.id,
        from_entry_id = from_entry.id,
        to_entry_id = to_entry.id,
        "Entries created"
    );

    let (from_account, to_account) = adjust_pair_ordered(
        scope,
        (params.from_account_id, -params.amount),
        (params.to_account_id, params.amount),
    )
    .await?;

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}
