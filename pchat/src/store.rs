//! Persistence contracts for conversations, messages, memories, and binary
//! objects, plus in-memory implementations.
//!
//! ```rust
//! use pchat::{ChatStore, Conversation, InMemoryChatStore};
//! use pcommon::{ConversationId, UserId};
//!
//! # tokio_test_block(async {
//! let store = InMemoryChatStore::new();
//! let conversation = Conversation::new(ConversationId::new("c1"), UserId::new("u1"), "Weather");
//! store.create_conversation(conversation).await.expect("create");
//! assert!(store.get_conversation(&ConversationId::new("c1")).await.expect("get").is_some());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use pcommon::{BoxFuture, ConversationId, MessageId, UserId};

use crate::{ChatError, ChatMessage, Conversation, MemoryRecord, Visibility};

pub trait ChatStore: Send + Sync {
    fn get_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>>;

    /// Creating an id that already exists for the same owner is a no-op. An
    /// existing id owned by someone else is an `Authorization` error.
    fn create_conversation<'a>(
        &'a self,
        conversation: Conversation,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    /// Removes the conversation and every message in it.
    fn delete_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    fn update_visibility<'a>(
        &'a self,
        id: &'a ConversationId,
        visibility: Visibility,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    fn append_messages<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    /// Deleting a missing message succeeds.
    fn delete_message<'a>(&'a self, id: &'a MessageId) -> BoxFuture<'a, Result<(), ChatError>>;

    /// Messages in creation order.
    fn load_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>>;

    fn list_memories<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<MemoryRecord>, ChatError>>;

    fn append_memory<'a>(&'a self, record: MemoryRecord) -> BoxFuture<'a, Result<(), ChatError>>;

    /// One page of a user's conversations, newest first, with the total count.
    fn list_conversations<'a>(
        &'a self,
        user_id: &'a UserId,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, Result<(Vec<Conversation>, u64), ChatError>>;
}

/// Zero-based row offset for a 1-based page.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

#[derive(Debug, Default)]
struct InMemoryState {
    conversations: Vec<Conversation>,
    messages: Vec<ChatMessage>,
    memories: Vec<MemoryRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryChatStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut InMemoryState) -> Result<T, ChatError>,
    ) -> Result<T, ChatError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ChatError::store("chat store lock poisoned"))?;
        f(&mut state)
    }
}

impl ChatStore for InMemoryChatStore {
    fn get_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                Ok(state
                    .conversations
                    .iter()
                    .find(|conversation| &conversation.id == id)
                    .cloned())
            })
        })
    }

    fn create_conversation<'a>(
        &'a self,
        conversation: Conversation,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                if let Some(existing) = state
                    .conversations
                    .iter()
                    .find(|existing| existing.id == conversation.id)
                {
                    if existing.user_id == conversation.user_id {
                        return Ok(());
                    }
                    return Err(ChatError::authorization(
                        "conversation belongs to another user",
                    ));
                }
                state.conversations.push(conversation);
                Ok(())
            })
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                state.messages.retain(|message| &message.conversation_id != id);
                state.conversations.retain(|conversation| &conversation.id != id);
                Ok(())
            })
        })
    }

    fn update_visibility<'a>(
        &'a self,
        id: &'a ConversationId,
        visibility: Visibility,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                let conversation = state
                    .conversations
                    .iter_mut()
                    .find(|conversation| &conversation.id == id)
                    .ok_or_else(|| ChatError::not_found("Chat not found"))?;
                conversation.visibility = visibility;
                Ok(())
            })
        })
    }

    fn append_messages<'a>(
        &'a self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                state.messages.extend(messages);
                Ok(())
            })
        })
    }

    fn delete_message<'a>(&'a self, id: &'a MessageId) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                state.messages.retain(|message| &message.id != id);
                Ok(())
            })
        })
    }

    fn load_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                let mut messages: Vec<ChatMessage> = state
                    .messages
                    .iter()
                    .filter(|message| &message.conversation_id == conversation_id)
                    .cloned()
                    .collect();
                // stable sort keeps insertion order for equal timestamps
                messages.sort_by_key(|message| message.created_at);
                Ok(messages)
            })
        })
    }

    fn list_memories<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<MemoryRecord>, ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                Ok(state
                    .memories
                    .iter()
                    .filter(|record| &record.user_id == user_id)
                    .cloned()
                    .collect())
            })
        })
    }

    fn append_memory<'a>(&'a self, record: MemoryRecord) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            record.validate()?;
            self.with_state(|state| {
                state.memories.push(record);
                Ok(())
            })
        })
    }

    fn list_conversations<'a>(
        &'a self,
        user_id: &'a UserId,
        page: u32,
        page_size: u32,
    ) -> BoxFuture<'a, Result<(Vec<Conversation>, u64), ChatError>> {
        Box::pin(async move {
            self.with_state(|state| {
                let mut owned: Vec<&Conversation> = state
                    .conversations
                    .iter()
                    .filter(|conversation| &conversation.user_id == user_id)
                    .collect();
                owned.reverse();
                owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

                let total = owned.len() as u64;
                let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
                let chats = owned
                    .into_iter()
                    .skip(offset)
                    .take(page_size as usize)
                    .cloned()
                    .collect();
                Ok((chats, total))
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

/// Binary object storage for generated images and uploads.
pub trait ObjectStorage: Send + Sync {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, ChatError>>;
}

#[derive(Debug)]
pub struct InMemoryObjectStorage {
    base_url: String,
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Stored bytes and content type for `key`.
    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStorage for InMemoryObjectStorage {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, ChatError>> {
        Box::pin(async move {
            let mut objects = self
                .objects
                .lock()
                .map_err(|_| ChatError::store("object storage lock poisoned"))?;
            objects.insert(key.to_string(), (bytes, content_type.to_string()));

            Ok(StoredObject {
                url: format!("{}/{key}", self.base_url),
                key: key.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{MessageContent, MessageRole};

    fn conversation(id: &str, user: &str, minutes_ago: i64) -> Conversation {
        let mut conversation = Conversation::new(ConversationId::new(id), UserId::new(user), id);
        conversation.created_at = Utc::now() - Duration::minutes(minutes_ago);
        conversation
    }

    #[tokio::test]
    async fn create_conversation_is_idempotent_for_owner_only() {
        let store = InMemoryChatStore::new();
        store
            .create_conversation(conversation("c1", "alice", 0))
            .await
            .expect("first create");
        store
            .create_conversation(conversation("c1", "alice", 0))
            .await
            .expect("same owner create is a no-op");

        let err = store
            .create_conversation(conversation("c1", "bob", 0))
            .await
            .expect_err("other owner must be rejected");
        assert_eq!(err.kind, crate::ChatErrorKind::Authorization);
    }

    #[tokio::test]
    async fn delete_conversation_cascades_to_messages() {
        let store = InMemoryChatStore::new();
        let id = ConversationId::new("c1");
        store
            .create_conversation(conversation("c1", "alice", 0))
            .await
            .expect("create");
        store
            .append_messages(vec![ChatMessage::new(
                id.clone(),
                MessageRole::User,
                MessageContent::Text("hi".to_string()),
            )])
            .await
            .expect("append");

        store.delete_conversation(&id).await.expect("delete");
        assert!(store.get_conversation(&id).await.expect("get").is_none());
        assert!(store.load_messages(&id).await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn delete_message_is_idempotent() {
        let store = InMemoryChatStore::new();
        let message = ChatMessage::new(
            ConversationId::new("c1"),
            MessageRole::User,
            MessageContent::Text("hi".to_string()),
        );
        let id = message.id.clone();
        store.append_messages(vec![message]).await.expect("append");

        store.delete_message(&id).await.expect("first delete");
        store.delete_message(&id).await.expect("second delete");
        assert!(
            store
                .load_messages(&ConversationId::new("c1"))
                .await
                .expect("load")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn list_conversations_pages_newest_first() {
        let store = InMemoryChatStore::new();
        for (index, id) in ["old", "mid", "new"].into_iter().enumerate() {
            store
                .create_conversation(conversation(id, "alice", 10 - index as i64))
                .await
                .expect("create");
        }
        store
            .create_conversation(conversation("other", "bob", 0))
            .await
            .expect("create");

        let alice = UserId::new("alice");
        let (first, total) = store
            .list_conversations(&alice, 1, 2)
            .await
            .expect("page 1");
        assert_eq!(total, 3);
        let ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);

        let (second, _) = store
            .list_conversations(&alice, 2, 2)
            .await
            .expect("page 2");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id.as_str(), "old");
    }

    #[tokio::test]
    async fn append_memory_rejects_oversized_text() {
        let store = InMemoryChatStore::new();
        let user = UserId::new("alice");
        let err = store
            .append_memory(MemoryRecord::new(user.clone(), "x".repeat(301)))
            .await
            .expect_err("too long");
        assert_eq!(err.kind, crate::ChatErrorKind::InvalidRequest);
        assert!(store.list_memories(&user).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn object_storage_builds_urls_from_base() {
        let storage = InMemoryObjectStorage::new("http://localhost:3000/files/");
        let stored = storage
            .put("uploads/a.png", vec![1, 2, 3], "image/png")
            .await
            .expect("put");
        assert_eq!(stored.url, "http://localhost:3000/files/uploads/a.png");
        assert_eq!(
            storage.get("uploads/a.png"),
            Some((vec![1, 2, 3], "image/png".to_string()))
        );
    }
}
