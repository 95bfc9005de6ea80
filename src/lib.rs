//! Transfer Ledger - double-entry balance bookkeeping
//!
//! Accounts hold balances; every transfer between two accounts is written as
//! one transfer record, a debit entry and a credit entry, and two balance
//! updates, all inside one database transaction.
//!
//! # Modules
//!
//! - [`ledger`] - Records, repositories, transaction boundary and transfer engine
//! - [`db`] - Connection pool and schema
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use config::LedgerConfig;
pub use db::{Backend, Database};
pub use ledger::{
    Account, Currency, Entry, LedgerError, LedgerRepository, LedgerResult, ScopedLedger, Store,
    Transfer, TransferExecutor, TransferTxParams, TransferTxResult,
};
