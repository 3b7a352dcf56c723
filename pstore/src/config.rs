//! Store selection from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use pchat::{ChatStore, InMemoryChatStore};

use crate::sqlite::default_sqlite_path;
use crate::{PostgresChatStore, PostgresStoreConfig, SqliteChatStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Postgres(PostgresStoreConfig),
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

impl StoreConfig {
    /// Accepts `memory`, `sqlite://<path>`, or `postgres://...` / `postgresql://...`.
    ///
    /// ```rust
    /// use pstore::StoreConfig;
    ///
    /// assert_eq!(StoreConfig::from_database_url("memory").unwrap(), StoreConfig::InMemory);
    /// assert!(matches!(
    ///     StoreConfig::from_database_url("sqlite://data/chat.db").unwrap(),
    ///     StoreConfig::Sqlite { .. }
    /// ));
    /// ```
    pub fn from_database_url(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();
        if url.eq_ignore_ascii_case("memory") {
            return Ok(Self::InMemory);
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(StoreError::invalid_request("sqlite url is missing a path"));
            }
            return Ok(Self::Sqlite {
                path: PathBuf::from(path),
            });
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return PostgresStoreConfig::from_url(url).map(Self::Postgres);
        }
        Err(StoreError::invalid_request(format!(
            "unsupported database url: '{url}'"
        )))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres(_) => "postgres",
            Self::InMemory => "memory",
        }
    }
}

pub fn create_chat_store(config: StoreConfig) -> Result<Arc<dyn ChatStore>, StoreError> {
    match config {
        StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteChatStore::new(path)?)),
        StoreConfig::Postgres(config) => Ok(Arc::new(PostgresChatStore::new(config)?)),
        StoreConfig::InMemory => Ok(Arc::new(InMemoryChatStore::new())),
    }
}
