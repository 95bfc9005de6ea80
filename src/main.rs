//! Ledger command-line entry point
//!
//! ```text
//! ledger [--env dev] --migrate
//! ledger [--env dev] --create-account <owner> <currency> <balance>
//! ledger [--env dev] --account <id>
//! ledger [--env dev] --transfer <from_account_id> <to_account_id> <amount>
//! ```
//!
//! Results are printed as JSON on stdout.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use transfer_ledger::config::LedgerConfig;
use transfer_ledger::db::Database;
use transfer_ledger::ledger::{
    CreateAccountParams, Currency, LedgerRepository, Store, TransferExecutor, TransferTxParams,
};
use transfer_ledger::logging::init_logging;

const USAGE: &str = "usage: ledger [--env <name>] (--migrate | --create-account <owner> <currency> <balance> | --account <id> | --transfer <from> <to> <amount>)";

// ============================================================
// ARGUMENTS
// ============================================================

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

/// The `count` values following `flag`, if the flag is present with all of them
fn get_values(flag: &str, count: usize) -> Option<Vec<String>> {
    let args: Vec<String> = std::env::args().collect();
    let pos = args.iter().position(|a| a == flag)?;
    let values: Vec<String> = args.iter().skip(pos + 1).take(count).cloned().collect();
    (values.len() == count).then_some(values)
}

fn parse_i64(value: &str, what: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let config = LedgerConfig::load(&env)
        .with_context(|| format!("Failed to load config for env '{}'", env))?;
    let _log_guard = init_logging(&config);

    tracing::info!(git_hash = env!("GIT_HASH"), "Starting ledger in {} mode", env);

    let db = Database::connect_with(&config.database)
        .await
        .context("Failed to connect to ledger database")?;
    let outcome = run(&db, &config).await;
    db.close().await;
    outcome
}

async fn run(db: &Database, config: &LedgerConfig) -> Result<()> {
    let migrate = has_flag("--migrate");
    if migrate {
        db.migrate().await.context("Failed to migrate schema")?;
    }

    let store = Store::from_database(db);

    if let Some(values) = get_values("--create-account", 3) {
        let currency: Currency = values[1].parse()?;
        let account = store
            .queries()
            .create_account(CreateAccountParams {
                owner: values[0].clone(),
                balance: parse_i64(&values[2], "balance")?,
                currency,
            })
            .await?;
        tracing::info!(account_id = account.id, owner = %account.owner, "Account created");
        print_json(&account)
    } else if let Some(values) = get_values("--account", 1) {
        let account = store
            .queries()
            .get_account(parse_i64(&values[0], "account id")?)
            .await?;
        print_json(&account)
    } else if let Some(values) = get_values("--transfer", 3) {
        let params = TransferTxParams::new(
            parse_i64(&values[0], "from account id")?,
            parse_i64(&values[1], "to account id")?,
            parse_i64(&values[2], "amount")?,
        );
        let executor = TransferExecutor::from_config(store, &config.transfer);
        tracing::info!(policies = ?executor.policy_names(), "Transfer executor ready");

        let result = match config.transfer.timeout_ms {
            Some(ms) => {
                executor
                    .transfer_with_deadline(params, Duration::from_millis(ms))
                    .await
            }
            None => executor.transfer(params).await,
        };

        match result {
            Ok(result) => print_json(&result),
            Err(e) => bail!("{} ({})", e, e.code()),
        }
    } else if migrate {
        Ok(())
    } else {
        bail!(USAGE)
    }
}
