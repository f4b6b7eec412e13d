//! SQLite implementations of storage interfaces.
//!
//! Every multi-step write runs inside `BEGIN IMMEDIATE`, which takes the
//! database write lock before the first read. The row that a conditional
//! update checks therefore cannot change between the check and the write.
//!
//! The transaction is an sqlx [`Transaction`]: a caller that is dropped
//! mid-write (a cancelled request) rolls back before the connection is
//! reused.

use std::str::FromStr;
use std::time::Duration;

use sea_query::{Expr, SimpleExpr};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::warn;

use crate::config::StorageConfig;

use super::schema::{CREATE_INDEXES, CREATE_TABLES};
use super::Result;

mod assistance_ledger;
mod camp_store;
mod need_store;
mod pledge_store;
mod profile_store;
mod volunteer_store;

pub use assistance_ledger::SqliteAssistanceLedger;
pub use camp_store::SqliteCampStore;
pub use need_store::SqliteNeedStore;
pub use pledge_store::SqlitePledgeStore;
pub use profile_store::SqliteProfileStore;
pub use volunteer_store::SqliteVolunteerStore;

/// Open a pool for the configured database file.
///
/// Foreign keys are enabled on every connection; the journal runs in WAL
/// mode so readers are not blocked by the single writer.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    if config.path != ":memory:" {
        if let Some(parent) = std::path::Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    super::StorageError::Database(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
    }

    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(opts)
        .await?;

    Ok(pool)
}

/// Create tables and indexes if they don't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Tiebreak for rows created within the same timestamp tick.
pub(crate) fn insertion_order() -> SimpleExpr {
    Expr::cust("rowid")
}

/// Open an immediate (write-locking) transaction on a pooled connection.
pub(crate) async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Commit on success, roll back on failure, and hand the result through.
///
/// A failed commit leaves the transaction open; dropping it rolls back.
pub(crate) async fn finish<T>(tx: Transaction<'static, Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
