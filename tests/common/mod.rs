//! Shared harness for ledger integration tests
//!
//! Every harness gets its own SQLite file in a temp directory, migrated and
//! ready, so tests can run in parallel without seeing each other's rows.

#![allow(dead_code)]

use rand::Rng;
use rand::seq::SliceRandom;
use tempfile::TempDir;

use transfer_ledger::config::DatabaseConfig;
use transfer_ledger::db::Database;
use transfer_ledger::ledger::{
    Account, CreateAccountParams, Currency, LedgerRepository, Store, TransferExecutor,
};

pub struct TestHarness {
    pub db: Database,
    pub store: Store,
    // Removes the database file on drop
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_max_connections(8).await
    }

    pub async fn with_max_connections(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("ledger.db").display()
        );

        let mut config = DatabaseConfig::new(url);
        config.max_connections = max_connections;

        let db = Database::connect_with(&config)
            .await
            .expect("connect test database");
        db.migrate().await.expect("migrate test database");
        let store = Store::from_database(&db);

        Self {
            db,
            store,
            _dir: dir,
        }
    }

    pub fn executor(&self) -> TransferExecutor {
        TransferExecutor::new(self.store.clone())
    }

    pub async fn create_account(&self, balance: i64, currency: Currency) -> Account {
        self.store
            .queries()
            .create_account(CreateAccountParams {
                owner: random_owner(),
                balance,
                currency,
            })
            .await
            .expect("create account")
    }

    pub async fn create_random_account(&self) -> Account {
        self.create_account(random_money(), random_currency()).await
    }

    pub async fn balance_of(&self, account_id: i64) -> i64 {
        self.store
            .queries()
            .get_account(account_id)
            .await
            .expect("get account")
            .balance
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.store.pool())
            .await
            .expect("count rows")
    }

    pub async fn count_entries_for(&self, account_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM entries WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(self.store.pool())
            .await
            .expect("count entries")
    }

    pub async fn total_balance(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(balance), 0) FROM accounts")
            .fetch_one(self.store.pool())
            .await
            .expect("sum balances")
    }
}

// ============================================================================
// Random fixtures
// ============================================================================

pub fn random_string(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn random_owner() -> String {
    random_string(6)
}

pub fn random_money() -> i64 {
    rand::thread_rng().gen_range(0..=10_000_000)
}

pub fn random_currency() -> Currency {
    *Currency::ALL
        .choose(&mut rand::thread_rng())
        .expect("currency list is not empty")
}
