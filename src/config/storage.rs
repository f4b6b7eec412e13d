//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    /// Process-local, lost on exit. Used by tests and demos.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// SQLite database file. `:memory:` keeps it in process.
    pub path: String,
    /// Pool size. Writers still serialize on the database lock.
    pub max_connections: u32,
    /// How long a writer waits for the database lock before giving up.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            path: "./data/reliefhub.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}
