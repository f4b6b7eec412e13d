//! Storage interfaces and implementations.
//!
//! One trait per relation, plus [`PledgeStore`] for the pledge commit that
//! spans the need and ledger relations. Each backend implements all of them
//! over a shared connection pool (SQLite) or a shared lock (in-memory), so
//! multi-relation operations commit as one unit.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::{StorageConfig, StorageType};
use crate::model::{DeliveryStatus, ValidationError};

mod assistance_ledger;
mod camp_store;
pub mod helpers;
pub mod mock;
mod need_store;
mod pledge_store;
mod profile_store;
mod volunteer_store;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use assistance_ledger::AssistanceLedger;
pub use camp_store::CampStore;
pub use need_store::NeedStore;
pub use pledge_store::PledgeStore;
pub use profile_store::ProfileStore;
pub use volunteer_store::VolunteerStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Over-commit on need {need_id}: requested {requested}, remaining {remaining}")]
    OverCommit {
        need_id: Uuid,
        requested: i64,
        remaining: i64,
    },

    #[error("Camp {camp_id} is at capacity ({capacity} seats)")]
    CapacityExceeded { camp_id: Uuid, capacity: i64 },

    #[error("Invalid delivery transition: {from} -> {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// A concurrent writer won the row; the operation can be retried.
    #[error("Write contention: {0}")]
    Contention(String),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Database error: {0}")]
    Database(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StorageError::NotFound { entity, id }
    }

    pub fn is_contention(&self) -> bool {
        matches!(self, StorageError::Contention(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_BUSY_SNAPSHOT (517)
            if matches!(db.code().as_deref(), Some("5") | Some("6") | Some("517")) {
                return StorageError::Contention(db.message().to_string());
            }
            if db.is_unique_violation() {
                return StorageError::Duplicate(db.message().to_string());
            }
        }
        StorageError::Database(err.to_string())
    }
}

/// The full set of stores used by the services.
#[derive(Clone)]
pub struct Stores {
    pub camps: Arc<dyn CampStore>,
    pub needs: Arc<dyn NeedStore>,
    pub ledger: Arc<dyn AssistanceLedger>,
    pub pledges: Arc<dyn PledgeStore>,
    pub volunteers: Arc<dyn VolunteerStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Stores {
    /// In-memory stores sharing one lock.
    pub fn in_memory() -> Self {
        let db = Arc::new(mock::MockDatabase::default());
        Self::from_mock(db)
    }

    /// Wrap an existing in-memory database (tests reach into it).
    pub fn from_mock(db: Arc<mock::MockDatabase>) -> Self {
        Self {
            camps: Arc::new(mock::MockCampStore::new(db.clone())),
            needs: Arc::new(mock::MockNeedStore::new(db.clone())),
            ledger: Arc::new(mock::MockAssistanceLedger::new(db.clone())),
            pledges: Arc::new(mock::MockPledgeStore::new(db.clone())),
            volunteers: Arc::new(mock::MockVolunteerStore::new(db.clone())),
            profiles: Arc::new(mock::MockProfileStore::new(db)),
        }
    }

    /// SQLite stores over one pool. Creates the schema if missing.
    #[cfg(feature = "sqlite")]
    pub async fn sqlite(pool: sqlx::SqlitePool) -> Result<Self> {
        sqlite::init_schema(&pool).await?;
        Ok(Self {
            camps: Arc::new(sqlite::SqliteCampStore::new(pool.clone())),
            needs: Arc::new(sqlite::SqliteNeedStore::new(pool.clone())),
            ledger: Arc::new(sqlite::SqliteAssistanceLedger::new(pool.clone())),
            pledges: Arc::new(sqlite::SqlitePledgeStore::new(pool.clone())),
            volunteers: Arc::new(sqlite::SqliteVolunteerStore::new(pool.clone())),
            profiles: Arc::new(sqlite::SqliteProfileStore::new(pool)),
        })
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: in-memory");
            Ok(Stores::in_memory())
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            info!("Storage: sqlite at {}", config.path);
            let pool = sqlite::connect(config).await?;
            Stores::sqlite(pool).await
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => Err(StorageError::Database(
            "SQLite storage requested but 'sqlite' feature is not enabled".to_string(),
        )),
    }
}
