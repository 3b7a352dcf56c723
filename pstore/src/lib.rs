//! Durable persistence for palaver conversations.
//!
//! [`SqliteChatStore`] and [`PostgresChatStore`] implement [`pchat::ChatStore`];
//! [`FilesystemObjectStorage`] implements [`pchat::ObjectStorage`].

mod codec;
mod config;
mod error;
mod objects;
mod postgres;
mod sqlite;

pub use config::{StoreConfig, create_chat_store};
pub use error::{StoreError, StoreErrorKind};
pub use objects::FilesystemObjectStorage;
pub use postgres::{PostgresChatStore, PostgresStoreConfig};
pub use sqlite::SqliteChatStore;
