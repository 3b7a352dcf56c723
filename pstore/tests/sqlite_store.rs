use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Duration, Utc};
use pchat::{
    ChatErrorKind, ChatMessage, ChatStore, ContentPart, Conversation, MemoryRecord,
    MessageContent, MessageRole, ToolInvocation, Visibility,
};
use pcommon::{ConversationId, UserId};
use pstore::SqliteChatStore;
use serde_json::json;

fn temp_db() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("pstore-sqlite-{nanos}"))
        .join("palaver.db")
}

fn conversation(id: &str, user: &str, minutes_ago: i64) -> Conversation {
    let mut conversation = Conversation::new(ConversationId::new(id), UserId::new(user), id);
    conversation.created_at = Utc::now() - Duration::minutes(minutes_ago);
    conversation
}

fn tool_message(conversation_id: &ConversationId) -> ChatMessage {
    let mut invocation = ToolInvocation::pending(
        "getWeather",
        "call_1",
        json!({"latitude": 31.5, "longitude": 74.3}),
    );
    invocation
        .resolve(json!({"current": {"temperature_2m": 21.0}}))
        .expect("resolve");
    ChatMessage::new(
        conversation_id.clone(),
        MessageRole::Assistant,
        MessageContent::Parts(vec![
            ContentPart::ToolInvocation(invocation),
            ContentPart::text("It is mild in Lahore."),
        ]),
    )
}

#[tokio::test]
async fn conversations_and_messages_survive_reopen() {
    let path = temp_db();
    let id = ConversationId::new("chat-1");
    {
        let store = SqliteChatStore::new(&path).expect("open");
        store
            .create_conversation(conversation("chat-1", "alice", 0))
            .await
            .expect("create");
        let user = ChatMessage::new(
            id.clone(),
            MessageRole::User,
            MessageContent::Text("weather in Lahore?".to_string()),
        );
        store
            .append_messages(vec![user, tool_message(&id)])
            .await
            .expect("append");
    }

    let store = SqliteChatStore::new(&path).expect("reopen");
    let loaded = store
        .get_conversation(&id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(loaded.user_id, UserId::new("alice"));
    assert_eq!(loaded.visibility, Visibility::Private);

    let messages = store.load_messages(&id).await.expect("load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].text(), "weather in Lahore?");
    assert_eq!(messages[1].text(), "It is mild in Lahore.");
    let invocations = messages[1].content.tool_invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations[0].result(),
        Some(&json!({"current": {"temperature_2m": 21.0}}))
    );

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn create_is_idempotent_for_the_owner_only() {
    let store = SqliteChatStore::new_in_memory().expect("open");
    store
        .create_conversation(conversation("c1", "alice", 0))
        .await
        .expect("create");
    store
        .create_conversation(conversation("c1", "alice", 0))
        .await
        .expect("repeat create");

    let error = store
        .create_conversation(conversation("c1", "bob", 0))
        .await
        .expect_err("other owner");
    assert_eq!(error.kind, ChatErrorKind::Authorization);
}

#[tokio::test]
async fn delete_conversation_cascades_and_delete_message_is_idempotent() {
    let store = SqliteChatStore::new_in_memory().expect("open");
    let keep = ConversationId::new("keep");
    let drop = ConversationId::new("drop");
    for id in ["keep", "drop"] {
        store
            .create_conversation(conversation(id, "alice", 0))
            .await
            .expect("create");
    }
    let kept = ChatMessage::new(keep.clone(), MessageRole::User, MessageContent::Text("a".into()));
    let kept_id = kept.id.clone();
    store
        .append_messages(vec![
            kept,
            ChatMessage::new(drop.clone(), MessageRole::User, MessageContent::Text("b".into())),
        ])
        .await
        .expect("append");

    store.delete_conversation(&drop).await.expect("delete");
    assert!(store.get_conversation(&drop).await.expect("get").is_none());
    assert!(store.load_messages(&drop).await.expect("load").is_empty());
    assert_eq!(store.load_messages(&keep).await.expect("load").len(), 1);

    store.delete_message(&kept_id).await.expect("delete message");
    store.delete_message(&kept_id).await.expect("delete again");
    assert!(store.load_messages(&keep).await.expect("load").is_empty());
}

#[tokio::test]
async fn history_pages_newest_first_per_user() {
    let store = SqliteChatStore::new_in_memory().expect("open");
    for (index, id) in ["old", "mid", "new"].into_iter().enumerate() {
        store
            .create_conversation(conversation(id, "alice", 10 - index as i64))
            .await
            .expect("create");
    }
    store
        .create_conversation(conversation("theirs", "bob", 0))
        .await
        .expect("create");

    let alice = UserId::new("alice");
    let (first, total) = store.list_conversations(&alice, 1, 2).await.expect("page 1");
    assert_eq!(total, 3);
    let ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid"]);

    let (second, _) = store.list_conversations(&alice, 2, 2).await.expect("page 2");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id.as_str(), "old");

    let (beyond, total) = store.list_conversations(&alice, 5, 2).await.expect("page 5");
    assert!(beyond.is_empty());
    assert_eq!(total, 3);
}

#[tokio::test]
async fn visibility_updates_require_an_existing_conversation() {
    let store = SqliteChatStore::new_in_memory().expect("open");
    let id = ConversationId::new("c1");
    store
        .create_conversation(conversation("c1", "alice", 0))
        .await
        .expect("create");

    store
        .update_visibility(&id, Visibility::Public)
        .await
        .expect("update");
    let loaded = store.get_conversation(&id).await.expect("get").expect("exists");
    assert_eq!(loaded.visibility, Visibility::Public);

    let error = store
        .update_visibility(&ConversationId::new("missing"), Visibility::Public)
        .await
        .expect_err("missing");
    assert_eq!(error.kind, ChatErrorKind::NotFound);
}

#[tokio::test]
async fn memories_are_validated_and_listed_in_insertion_order() {
    let store = SqliteChatStore::new_in_memory().expect("open");
    let alice = UserId::new("alice");

    store
        .append_memory(MemoryRecord::new(alice.clone(), "likes green tea"))
        .await
        .expect("first");
    store
        .append_memory(MemoryRecord::new(alice.clone(), "lives in Lahore"))
        .await
        .expect("second");
    let error = store
        .append_memory(MemoryRecord::new(alice.clone(), "x".repeat(301)))
        .await
        .expect_err("too long");
    assert_eq!(error.kind, ChatErrorKind::InvalidRequest);

    let texts: Vec<String> = store
        .list_memories(&alice)
        .await
        .expect("list")
        .into_iter()
        .map(|record| record.text)
        .collect();
    assert_eq!(texts, vec!["likes green tea", "lives in Lahore"]);
    assert!(
        store
            .list_memories(&UserId::new("bob"))
            .await
            .expect("list")
            .is_empty()
    );
}
