//! Ledger schema
//!
//! Same tables on both backends; only the auto-increment key syntax differs.
//! Timestamps are BIGINT microseconds since the Unix epoch.

use sqlx::AnyPool;

use super::Backend;

const CREATE_ACCOUNTS_TABLE_PG: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          BIGSERIAL PRIMARY KEY,
    owner       VARCHAR NOT NULL,
    balance     BIGINT NOT NULL,
    currency    VARCHAR NOT NULL,
    created_at  BIGINT NOT NULL
)
"#;

const CREATE_ENTRIES_TABLE_PG: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id          BIGSERIAL PRIMARY KEY,
    account_id  BIGINT NOT NULL REFERENCES accounts (id),
    amount      BIGINT NOT NULL,
    created_at  BIGINT NOT NULL
)
"#;

const CREATE_TRANSFERS_TABLE_PG: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id               BIGSERIAL PRIMARY KEY,
    from_account_id  BIGINT NOT NULL REFERENCES accounts (id),
    to_account_id    BIGINT NOT NULL REFERENCES accounts (id),
    amount           BIGINT NOT NULL CHECK (amount > 0),
    created_at       BIGINT NOT NULL
)
"#;

const CREATE_ACCOUNTS_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner       TEXT NOT NULL,
    balance     INTEGER NOT NULL,
    currency    TEXT NOT NULL,
    created_at  INTEGER NOT NULL
)
"#;

const CREATE_ENTRIES_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id  INTEGER NOT NULL REFERENCES accounts (id),
    amount      INTEGER NOT NULL,
    created_at  INTEGER NOT NULL
)
"#;

const CREATE_TRANSFERS_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    from_account_id  INTEGER NOT NULL REFERENCES accounts (id),
    to_account_id    INTEGER NOT NULL REFERENCES accounts (id),
    amount           INTEGER NOT NULL CHECK (amount > 0),
    created_at       INTEGER NOT NULL
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS accounts_owner_idx ON accounts (owner)",
    "CREATE INDEX IF NOT EXISTS entries_account_id_idx ON entries (account_id)",
    "CREATE INDEX IF NOT EXISTS transfers_from_account_id_idx ON transfers (from_account_id)",
    "CREATE INDEX IF NOT EXISTS transfers_to_account_id_idx ON transfers (to_account_id)",
    "CREATE INDEX IF NOT EXISTS transfers_from_to_idx ON transfers (from_account_id, to_account_id)",
];

fn table_statements(backend: Backend) -> [&'static str; 3] {
    match backend {
        Backend::Postgres => [
            CREATE_ACCOUNTS_TABLE_PG,
            CREATE_ENTRIES_TABLE_PG,
            CREATE_TRANSFERS_TABLE_PG,
        ],
        Backend::Sqlite => [
            CREATE_ACCOUNTS_TABLE_SQLITE,
            CREATE_ENTRIES_TABLE_SQLITE,
            CREATE_TRANSFERS_TABLE_SQLITE,
        ],
    }
}

/// Create the ledger tables and indexes if they do not exist yet
pub async fn init_schema(pool: &AnyPool, backend: Backend) -> Result<(), sqlx::Error> {
    tracing::info!(backend = ?backend, "Initializing ledger schema");

    for statement in table_statements(backend).iter().chain(CREATE_INDEXES) {
        sqlx::query(*statement).execute(pool).await?;
    }

    tracing::info!("Ledger schema ready");
    Ok(())
}
