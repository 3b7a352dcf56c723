//! SQLite chat store.
//!
//! ```rust
//! use pchat::{ChatStore, Conversation};
//! use pcommon::{ConversationId, UserId};
//! use pstore::SqliteChatStore;
//!
//! let store = SqliteChatStore::new_in_memory().expect("open");
//! let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
//! runtime.block_on(async {
//!     let conversation = Conversation::new(ConversationId::new("c1"), UserId::new("u1"), "Hi");
//!     store.create_conversation(conversation).await.expect("create");
//!     assert!(store.get_conversation(&ConversationId::new("c1")).await.expect("get").is_some());
//! });
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pchat::{
    ChatError, ChatMessage, ChatStore, Conversation, MemoryRecord, MessageContent, Visibility,
    page_offset,
};
use pcommon::{BoxFuture, ConversationId, MessageId, UserId};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::StoreError;
use crate::codec::{decode_role, decode_time, decode_visibility, encode_time, ownership_conflict};

#[derive(Debug)]
pub struct SqliteChatStore {
    connection: Mutex<Connection>,
}

impl SqliteChatStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                StoreError::storage(format!("failed to create sqlite parent directory: {error}"))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            StoreError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            StoreError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                StoreError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::storage("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                user_id TEXT NOT NULL,
                visibility TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_user_created
            ON conversations(user_id, created_at);

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at, seq);

            CREATE TABLE IF NOT EXISTS memories (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_memories_user
            ON memories(user_id, seq);
            ",
        )
        .map_err(|error| StoreError::storage(format!("failed to initialize sqlite schema: {error}")))
    }

    fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn decode_conversation(
        (id, title, user_id, visibility, created_at): (String, String, String, String, i64),
    ) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: ConversationId::new(id),
            title,
            user_id: UserId::new(user_id),
            visibility: decode_visibility(&visibility)?,
            created_at: decode_time(created_at)?,
        })
    }

    fn find_conversation(
        conn: &Connection,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, title, user_id, visibility, created_at FROM conversations WHERE id = ?1",
                params![id.as_str()],
                Self::conversation_from_row,
            )
            .optional()
            .map_err(|error| StoreError::storage(format!("failed to query conversation: {error}")))?;

        row.map(Self::decode_conversation).transpose()
    }
}

impl ChatStore for SqliteChatStore {
    fn get_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            Ok(Self::find_conversation(&conn, id)?)
        })
    }

    fn create_conversation<'a>(
        &'a self,
        conversation: Conversation,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            if let Some(existing) = Self::find_conversation(&conn, &conversation.id)? {
                if existing.user_id == conversation.user_id {
                    return Ok(());
                }
                return Err(ownership_conflict());
            }

            conn.execute(
                "
                INSERT INTO conversations (id, title, user_id, visibility, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    conversation.id.as_str(),
                    &conversation.title,
                    conversation.user_id.as_str(),
                    conversation.visibility.as_str(),
                    encode_time(conversation.created_at),
                ],
            )
            .map_err(|error| StoreError::storage(format!("failed to insert conversation: {error}")))?;
            Ok(())
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut conn = self.connection()?;
            let tx = conn.transaction().map_err(|error| {
                StoreError::storage(format!("failed to begin sqlite transaction: {error}"))
            })?;
            tx.execute(
                "DELETE FROM messages WHERE conversation_id = ?1",
                params![id.as_str()],
            )
            .map_err(|error| StoreError::storage(format!("failed to delete messages: {error}")))?;
            tx.execute("DELETE FROM conversations WHERE id = ?1", params![id.as_str()])
                .map_err(|error| {
                    StoreError::storage(format!("failed to delete conversation: {error}"))
                })?;
            tx.commit().map_err(|error| {
                StoreError::storage(format!("failed to commit conversation delete: {error}"))
            })?;
            Ok(())
        })
    }

    fn update_visibility<'a>(
        &'a self,
        id: &'a ConversationId,
        visibility: Visibility,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let updated = conn
                .execute(
                    "UPDATE conversations SET visibility = ?1 WHERE id = ?2",
                    params![visibility.as_str(), id.as_str()],
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to update visibility: {error}"))
                })?;
            if updated == 0 {
                return Err(StoreError::not_found("Chat not found").into());
            }
            Ok(())
        })
    }

    fn append_messages<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut conn = self.connection()?;
            let tx = conn.transaction().map_err(|error| {
                StoreError::storage(format!("failed to begin sqlite transaction: {error}"))
            })?;
            for message in &messages {
                tx.execute(
                    "
                    INSERT INTO messages (id, conversation_id, role, content, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ",
                    params![
                        message.id.as_str(),
                        message.conversation_id.as_str(),
                        message.role.as_str(),
                        message.content.to_storage_string(),
                        encode_time(message.created_at),
                    ],
                )
                .map_err(|error| StoreError::storage(format!("failed to insert message: {error}")))?;
            }
            tx.commit().map_err(|error| {
                StoreError::storage(format!("failed to commit messages: {error}"))
            })?;
            Ok(())
        })
    }

    fn delete_message<'a>(&'a self, id: &'a MessageId) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            conn.execute("DELETE FROM messages WHERE id = ?1", params![id.as_str()])
                .map_err(|error| StoreError::storage(format!("failed to delete message: {error}")))?;
            Ok(())
        })
    }

    fn load_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut statement = conn
                .prepare(
                    "
                    SELECT id, role, content, created_at
                    FROM messages
                    WHERE conversation_id = ?1
                    ORDER BY created_at ASC, seq ASC
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare message query: {error}"))
                })?;

            let rows = statement
                .query_map(params![conversation_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|error| StoreError::storage(format!("failed to query messages: {error}")))?;

            let mut messages = Vec::new();
            for row in rows {
                let (id, role, content, created_at) = row.map_err(|error| {
                    StoreError::storage(format!("failed to read message row: {error}"))
                })?;
                messages.push(ChatMessage {
                    id: MessageId::new(id),
                    conversation_id: conversation_id.clone(),
                    role: decode_role(&role)?,
                    content: MessageContent::from_storage_string(&content),
                    created_at: decode_time(created_at)?,
                });
            }
            Ok(messages)
        })
    }

    fn list_memories<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<MemoryRecord>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut statement = conn
                .prepare("SELECT id, text, created_at FROM memories WHERE user_id = ?1 ORDER BY seq ASC")
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare memory query: {error}"))
                })?;

            let rows = statement
                .query_map(params![user_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|error| StoreError::storage(format!("failed to query memories: {error}")))?;

            let mut records = Vec::new();
            for row in rows {
                let (id, text, created_at) = row.map_err(|error| {
                    StoreError::storage(format!("failed to read memory row: {error}"))
                })?;
                records.push(MemoryRecord {
                    id,
                    user_id: user_id.clone(),
                    text,
                    created_at: decode_time(created_at)?,
                });
            }
            Ok(records)
        })
    }

    fn append_memory<'a>(&'a self, record: MemoryRecord) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            record.validate()?;
            let conn = self.connection()?;
            conn.execute(
                "INSERT INTO memories (id, user_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    &record.id,
                    record.user_id.as_str(),
                    &record.text,
                    encode_time(record.created_at),
                ],
            )
            .map_err(|error| StoreError::storage(format!("failed to insert memory: {error}")))?;
            Ok(())
        })
    }

    fn list_conversations<'a>(
        &'a self,
        user_id: &'a UserId,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, Result<(Vec<Conversation>, u64), ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let total: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM conversations WHERE user_id = ?1",
                    params![user_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to count conversations: {error}"))
                })?;

            let offset = i64::try_from(page_offset(page, page_size)).unwrap_or(i64::MAX);
            let mut statement = conn
                .prepare(
                    "
                    SELECT id, title, user_id, visibility, created_at
                    FROM conversations
                    WHERE user_id = ?1
                    ORDER BY created_at DESC, rowid DESC
                    LIMIT ?2 OFFSET ?3
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare history query: {error}"))
                })?;
            let rows = statement
                .query_map(
                    params![user_id.as_str(), i64::from(page_size), offset],
                    Self::conversation_from_row,
                )
                .map_err(|error| StoreError::storage(format!("failed to query history: {error}")))?;

            let mut conversations = Vec::new();
            for row in rows {
                let row = row.map_err(|error| {
                    StoreError::storage(format!("failed to read conversation row: {error}"))
                })?;
                conversations.push(Self::decode_conversation(row)?);
            }
            Ok((conversations, total.max(0) as u64))
        })
    }
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("PALAVER_SQLITE_PATH") {
        return PathBuf::from(explicit);
    }
    PathBuf::from("palaver.db")
}
