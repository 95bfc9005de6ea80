//! Opt-in transfer policies
//!
//! The ledger itself allows overdrafts and does not compare currencies. A
//! policy is checked inside the transfer's scope against the post-mutation
//! state; rejecting it rolls the whole transfer back.

use super::error::{LedgerError, LedgerResult};
use super::models::TransferTxResult;

pub trait TransferPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, result: &TransferTxResult) -> LedgerResult<()>;
}

/// Source balance must not end up below zero
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOverdraft;

impl TransferPolicy for RejectOverdraft {
    fn name(&self) -> &'static str {
        "reject_overdraft"
    }

    fn check(&self, result: &TransferTxResult) -> LedgerResult<()> {
        if result.from_account.balance < 0 {
            return Err(LedgerError::InsufficientBalance);
        }
        Ok(())
    }
}

/// Both accounts must hold the same currency
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireSameCurrency;

impl TransferPolicy for RequireSameCurrency {
    fn name(&self) -> &'static str {
        "require_same_currency"
    }

    fn check(&self, result: &TransferTxResult) -> LedgerResult<()> {
        let from = result.from_account.currency;
        let to = result.to_account.currency;
        if from != to {
            return Err(LedgerError::CurrencyMismatch { from, to });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::{Account, Currency, Entry, Transfer};
    use chrono::Utc;

    fn result_with(from_balance: i64, from: Currency, to: Currency) -> TransferTxResult {
        let now = Utc::now();
        TransferTxResult {
            transfer: Transfer {
                id: 1,
                from_account_id: 1,
                to_account_id: 2,
                amount: 10,
                created_at: now,
            },
            from_account: Account {
                id: 1,
                owner: "alice".to_string(),
                balance: from_balance,
                currency: from,
                created_at: now,
            },
            to_account: Account {
                id: 2,
                owner: "bob".to_string(),
                balance: 10,
                currency: to,
                created_at: now,
            },
            from_entry: Entry {
                id: 1,
                account_id: 1,
                amount: -10,
                created_at: now,
            },
            to_entry: Entry {
                id: 2,
                account_id: 2,
                amount: 10,
                created_at: now,
            },
        }
    }

    #[test]
    fn test_reject_overdraft() {
        let policy = RejectOverdraft;
        assert!(policy.check(&result_with(0, Currency::USD, Currency::USD)).is_ok());
        assert!(matches!(
            policy.check(&result_with(-1, Currency::USD, Currency::USD)),
            Err(LedgerError::InsufficientBalance)
        ));
    }

    #[test]
    fn test_require_same_currency() {
        let policy = RequireSameCurrency;
        assert!(policy.check(&result_with(5, Currency::IDR, Currency::IDR)).is_ok());
        assert!(matches!(
            policy.check(&result_with(5, Currency::USD, Currency::IDR)),
            Err(LedgerError::CurrencyMismatch {
                from: Currency::USD,
                to: Currency::IDR
            })
        ));
    }
}
