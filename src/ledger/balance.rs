//! Balance mutation
//!
//! Balances only change here, through a repository bound to an open scope.
//! Two-account changes always touch the lower account id first so that every
//! transaction takes row locks in the same global order.

use tracing::debug;

use super::error::LedgerResult;
use super::models::{Account, AddAccountBalanceParams};
use super::repository::ScopedLedger;

/// Apply `delta` to one account and return its post-mutation state
pub async fn adjust_balance<S>(scope: &mut S, account_id: i64, delta: i64) -> LedgerResult<Account>
where
    S: ScopedLedger + ?Sized,
{
    let account = scope
        .add_account_balance(AddAccountBalanceParams {
            id: account_id,
            amount: delta,
        })
        .await?;

    debug!(
        account_id = account_id,
        delta = delta,
        balance = account.balance,
        "Balance adjusted"
    );
    Ok(account)
}

/// Apply two `(account_id, delta)` adjustments in ascending account-id order.
///
/// The accounts come back in argument order, whichever was locked first.
pub async fn adjust_pair_ordered<S>(
    scope: &mut S,
    first: (i64, i64),
    second: (i64, i64),
) -> LedgerResult<(Account, Account)>
where
    S: ScopedLedger + ?Sized,
{
    if lock_first(first.0, second.0) {
        let a = adjust_balance(scope, first.0, first.1).await?;
        let b = adjust_balance(scope, second.0, second.1).await?;
        Ok((a, b))
    } else {
        let b = adjust_balance(scope, second.0, second.1).await?;
        let a = adjust_balance(scope, first.0, first.1).await?;
        Ok((a, b))
    }
}

/// Whether account `a` must be locked before account `b`
pub fn lock_first(a: i64, b: i64) -> bool {
    a < b
}
