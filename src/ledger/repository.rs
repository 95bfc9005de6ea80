//! Repository traits
//!
//! [`LedgerRepository`] is the accessor surface shared by the pooled handle
//! ([`Queries`]) and the transaction-bound handle ([`TxQueries`]), so transfer
//! logic does not care which one it runs against. Balance increments live on
//! [`ScopedLedger`], which only a transaction-bound handle implements.

use async_trait::async_trait;
use sqlx::{Any, AnyPool, Transaction};

use super::error::{LedgerError, LedgerResult};
use super::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams,
};
use super::queries;

/// Single-record accessors for accounts, entries and transfers
#[async_trait]
pub trait LedgerRepository: Send {
    // === Accounts ===

    async fn create_account(&mut self, arg: CreateAccountParams) -> LedgerResult<Account>;

    async fn get_account(&mut self, id: i64) -> LedgerResult<Account>;

    /// Accounts held by `arg.owner`, ordered by id
    async fn list_accounts(&mut self, arg: ListAccountsParams) -> LedgerResult<Vec<Account>>;

    async fn update_account(&mut self, arg: UpdateAccountParams) -> LedgerResult<Account>;

    async fn delete_account(&mut self, id: i64) -> LedgerResult<()>;

    // === Entries ===

    async fn create_entry(&mut self, arg: CreateEntryParams) -> LedgerResult<Entry>;

    async fn get_entry(&mut self, id: i64) -> LedgerResult<Entry>;

    async fn list_entries(&mut self, arg: ListEntriesParams) -> LedgerResult<Vec<Entry>>;

    // === Transfers ===

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> LedgerResult<Transfer>;

    async fn get_transfer(&mut self, id: i64) -> LedgerResult<Transfer>;

    async fn list_transfers(&mut self, arg: ListTransfersParams) -> LedgerResult<Vec<Transfer>>;
}

/// A repository bound to an open atomic scope
#[async_trait]
pub trait ScopedLedger: LedgerRepository {
    /// Add `arg.amount` to the balance and return the account as it is afterwards
    async fn add_account_balance(&mut self, arg: AddAccountBalanceParams) -> LedgerResult<Account>;
}

// ============================================================================
// Pooled handle
// ============================================================================

/// Repository running each call on its own pooled connection
#[derive(Clone, Debug)]
pub struct Queries {
    pool: AnyPool,
}

impl Queries {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for Queries {
    async fn create_account(&mut self, arg: CreateAccountParams) -> LedgerResult<Account> {
        queries::create_account(&self.pool, &arg).await
    }

    async fn get_account(&mut self, id: i64) -> LedgerResult<Account> {
        queries::get_account(&self.pool, id).await
    }

    async fn list_accounts(&mut self, arg: ListAccountsParams) -> LedgerResult<Vec<Account>> {
        queries::list_accounts(&self.pool, &arg).await
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> LedgerResult<Account> {
        queries::update_account(&self.pool, &arg).await
    }

    async fn delete_account(&mut self, id: i64) -> LedgerResult<()> {
        queries::delete_account(&self.pool, id).await
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> LedgerResult<Entry> {
        queries::create_entry(&self.pool, &arg).await
    }

    async fn get_entry(&mut self, id: i64) -> LedgerResult<Entry> {
        queries::get_entry(&self.pool, id).await
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> LedgerResult<Vec<Entry>> {
        queries::list_entries(&self.pool, &arg).await
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> LedgerResult<Transfer> {
        queries::create_transfer(&self.pool, &arg).await
    }

    async fn get_transfer(&mut self, id: i64) -> LedgerResult<Transfer> {
        queries::get_transfer(&self.pool, id).await
    }

    async fn list_transfers(&mut self, arg: ListTransfersParams) -> LedgerResult<Vec<Transfer>> {
        queries::list_transfers(&self.pool, &arg).await
    }
}

// ============================================================================
// Transaction-bound handle
// ============================================================================

/// Repository whose calls all run inside one open transaction.
///
/// Only [`Store::run_atomic`](super::store::Store::run_atomic) creates one and
/// only it commits or rolls back. Dropping it without either rolls back.
pub struct TxQueries {
    tx: Transaction<'static, Any>,
}

impl TxQueries {
    pub(crate) fn new(tx: Transaction<'static, Any>) -> Self {
        Self { tx }
    }

    pub(crate) async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await.map_err(LedgerError::from)
    }

    pub(crate) async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

#[async_trait]
impl LedgerRepository for TxQueries {
    async fn create_account(&mut self, arg: CreateAccountParams) -> LedgerResult<Account> {
        queries::create_account(&mut *self.tx, &arg).await
    }

    async fn get_account(&mut self, id: i64) -> LedgerResult<Account> {
        queries::get_account(&mut *self.tx, id).await
    }

    async fn list_accounts(&mut self, arg: ListAccountsParams) -> LedgerResult<Vec<Account>> {
        queries::list_accounts(&mut *self.tx, &arg).await
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> LedgerResult<Account> {
        queries::update_account(&mut *self.tx, &arg).await
    }

    async fn delete_account(&mut self, id: i64) -> LedgerResult<()> {
        queries::delete_account(&mut *self.tx, id).await
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> LedgerResult<Entry> {
        queries::create_entry(&mut *self.tx, &arg).await
    }

    async fn get_entry(&mut self, id: i64) -> LedgerResult<Entry> {
        queries::get_entry(&mut *self.tx, id).await
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> LedgerResult<Vec<Entry>> {
        queries::list_entries(&mut *self.tx, &arg).await
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> LedgerResult<Transfer> {
        queries::create_transfer(&mut *self.tx, &arg).await
    }

    async fn get_transfer(&mut self, id: i64) -> LedgerResult<Transfer> {
        queries::get_transfer(&mut *self.tx, id).await
    }

    async fn list_transfers(&mut self, arg: ListTransfersParams) -> LedgerResult<Vec<Transfer>> {
        queries::list_transfers(&mut *self.tx, &arg).await
    }
}

#[async_trait]
impl ScopedLedger for TxQueries {
    async fn add_account_balance(&mut self, arg: AddAccountBalanceParams) -> LedgerResult<Account> {
        queries::add_account_balance(&mut *self.tx, &arg).await
    }
}
