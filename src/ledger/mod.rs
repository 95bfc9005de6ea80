//! Double-entry ledger
//!
//! Accounts, entries and transfers stored through sqlx, plus the transfer
//! engine that writes them atomically.

pub mod balance;
pub mod error;
pub mod models;
pub mod policy;
pub mod queries;
pub mod repository;
pub mod store;
pub mod transfer;

pub use balance::{adjust_balance, adjust_pair_ordered};
pub use error::{LedgerError, LedgerResult};
pub use models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Currency, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, TransferTxParams, TransferTxResult, UpdateAccountParams,
};
pub use policy::{RejectOverdraft, RequireSameCurrency, TransferPolicy};
pub use repository::{LedgerRepository, Queries, ScopedLedger, TxQueries};
pub use store::Store;
pub use transfer::{TransferExecutor, execute_transfer};
