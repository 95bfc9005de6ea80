//! Single-statement ledger queries
//!
//! Every function runs exactly one statement against whatever executor it is
//! given: the pool for ambient reads and writes, or the connection of an open
//! transaction. Cross-record logic does not belong here.

use sqlx::any::AnyRow;
use sqlx::{Any, Executor, Row};

use super::error::{LedgerError, LedgerResult};
use super::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, UpdateAccountParams, now_micros, timestamp_from_micros,
};

// ============================================================================
// Row mapping
// ============================================================================

fn created_at(row: &AnyRow) -> Result<chrono::DateTime<chrono::Utc>, sqlx::Error> {
    let micros: i64 = row.try_get("created_at")?;
    timestamp_from_micros(micros)
        .ok_or_else(|| sqlx::Error::Decode(format!("invalid created_at: {}", micros).into()))
}

fn row_to_account(row: &AnyRow) -> Result<Account, sqlx::Error> {
    let currency: String = row.try_get("currency")?;
    Ok(Account {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        balance: row.try_get("balance")?,
        currency: currency
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: created_at(row)?,
    })
}

fn row_to_entry(row: &AnyRow) -> Result<Entry, sqlx::Error> {
    Ok(Entry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        created_at: created_at(row)?,
    })
}

fn row_to_transfer(row: &AnyRow) -> Result<Transfer, sqlx::Error> {
    Ok(Transfer {
        id: row.try_get("id")?,
        from_account_id: row.try_get("from_account_id")?,
        to_account_id: row.try_get("to_account_id")?,
        amount: row.try_get("amount")?,
        created_at: created_at(row)?,
    })
}

/// SQLite reads a negative LIMIT as "no limit" while PostgreSQL rejects it
fn check_page(limit: i64, offset: i64) -> LedgerResult<()> {
    if limit < 0 || offset < 0 {
        return Err(LedgerError::InvalidPage);
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

pub async fn create_account<'e, E>(executor: E, arg: &CreateAccountParams) -> LedgerResult<Account>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO accounts (owner, balance, currency, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, owner, balance, currency, created_at
        "#,
    )
    .bind(&arg.owner)
    .bind(arg.balance)
    .bind(arg.currency.as_str())
    .bind(now_micros())
    .fetch_one(executor)
    .await?;

    Ok(row_to_account(&row)?)
}

pub async fn get_account<'e, E>(executor: E, id: i64) -> LedgerResult<Account>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(LedgerError::AccountNotFound)?;

    Ok(row_to_account(&row)?)
}

pub async fn list_accounts<'e, E>(
    executor: E,
    arg: &ListAccountsParams,
) -> LedgerResult<Vec<Account>>
where
    E: Executor<'e, Database = Any>,
{
    check_page(arg.limit, arg.offset)?;

    let rows = sqlx::query(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE owner = $1
           ORDER BY id
           LIMIT $2 OFFSET $3"#,
    )
    .bind(&arg.owner)
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|r| row_to_account(r).map_err(LedgerError::from))
        .collect()
}

pub async fn update_account<'e, E>(executor: E, arg: &UpdateAccountParams) -> LedgerResult<Account>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"
        UPDATE accounts SET owner = $1
        WHERE id = $2
        RETURNING id, owner, balance, currency, created_at
        "#,
    )
    .bind(&arg.owner)
    .bind(arg.id)
    .fetch_optional(executor)
    .await?
    .ok_or(LedgerError::AccountNotFound)?;

    Ok(row_to_account(&row)?)
}

pub async fn delete_account<'e, E>(executor: E, id: i64) -> LedgerResult<()>
where
    E: Executor<'e, Database = Any>,
{
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| match LedgerError::from(e) {
            // Inbound references from entries/transfers, not a missing account
            LedgerError::AccountNotFound => LedgerError::AccountInUse(id),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AccountNotFound);
    }
    Ok(())
}

/// Engine-side increment; the new balance is computed by the database, never here.
pub async fn add_account_balance<'e, E>(
    executor: E,
    arg: &AddAccountBalanceParams,
) -> LedgerResult<Account>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"
        UPDATE accounts SET balance = balance + $1
        WHERE id = $2
        RETURNING id, owner, balance, currency, created_at
        "#,
    )
    .bind(arg.amount)
    .bind(arg.id)
    .fetch_optional(executor)
    .await?
    .ok_or(LedgerError::AccountNotFound)?;

    Ok(row_to_account(&row)?)
}

// ============================================================================
// Entries
// ============================================================================

pub async fn create_entry<'e, E>(executor: E, arg: &CreateEntryParams) -> LedgerResult<Entry>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO entries (account_id, amount, created_at)
        VALUES ($1, $2, $3)
        RETURNING id, account_id, amount, created_at
        "#,
    )
    .bind(arg.account_id)
    .bind(arg.amount)
    .bind(now_micros())
    .fetch_one(executor)
    .await?;

    Ok(row_to_entry(&row)?)
}

pub async fn get_entry<'e, E>(executor: E, id: i64) -> LedgerResult<Entry>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query("SELECT id, account_id, amount, created_at FROM entries WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(LedgerError::EntryNotFound)?;

    Ok(row_to_entry(&row)?)
}

pub async fn list_entries<'e, E>(executor: E, arg: &ListEntriesParams) -> LedgerResult<Vec<Entry>>
where
    E: Executor<'e, Database = Any>,
{
    check_page(arg.limit, arg.offset)?;

    let rows = sqlx::query(
        r#"SELECT id, account_id, amount, created_at
           FROM entries WHERE account_id = $1
           ORDER BY id
           LIMIT $2 OFFSET $3"#,
    )
    .bind(arg.account_id)
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|r| row_to_entry(r).map_err(LedgerError::from))
        .collect()
}

// ============================================================================
// Transfers
// ============================================================================

pub async fn create_transfer<'e, E>(executor: E, arg: &CreateTransferParams) -> LedgerResult<Transfer>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, from_account_id, to_account_id, amount, created_at
        "#,
    )
    .bind(arg.from_account_id)
    .bind(arg.to_account_id)
    .bind(arg.amount)
    .bind(now_micros())
    .fetch_one(executor)
    .await?;

    Ok(row_to_transfer(&row)?)
}

pub async fn get_transfer<'e, E>(executor: E, id: i64) -> LedgerResult<Transfer>
where
    E: Executor<'e, Database = Any>,
{
    let row = sqlx::query(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(LedgerError::TransferNotFound)?;

    Ok(row_to_transfer(&row)?)
}

pub async fn list_transfers<'e, E>(
    executor: E,
    arg: &ListTransfersParams,
) -> LedgerResult<Vec<Transfer>>
where
    E: Executor<'e, Database = Any>,
{
    check_page(arg.limit, arg.offset)?;

    let rows = sqlx::query(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers
           WHERE from_account_id = $1 OR to_account_id = $2
           ORDER BY id
           LIMIT $3 OFFSET $4"#,
    )
    .bind(arg.from_account_id)
    .bind(arg.to_account_id)
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|r| row_to_transfer(r).map_err(LedgerError::from))
        .collect()
}
