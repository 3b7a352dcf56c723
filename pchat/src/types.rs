//! Conversation, message, memory, and turn request types.
//!
//! Message content persists as a single string: plain text as-is, structured
//! parts as a JSON array.
//!
//! ```rust
//! use pchat::{ContentPart, MessageContent, ToolInvocation};
//! use serde_json::json;
//!
//! let mut invocation = ToolInvocation::pending("getWeather", "call_1", json!({"latitude": 31.5}));
//! invocation.resolve(json!({"current": {"temperature_2m": 30.1}})).expect("first resolve");
//! assert!(invocation.resolve(json!({})).is_err());
//!
//! let content = MessageContent::Parts(vec![
//!     ContentPart::text("Here you go."),
//!     ContentPart::ToolInvocation(invocation),
//! ]);
//! let stored = content.to_storage_string();
//! assert_eq!(MessageContent::from_storage_string(&stored), content);
//! ```

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use pcommon::{ConversationId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ChatError;

/// Maximum characters in one memory record.
pub const MEMORY_TEXT_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ChatError> {
        match value {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(ChatError::invalid_request(format!(
                "unknown visibility '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub user_id: UserId,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId, user_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            user_id,
            visibility: Visibility::Private,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ChatError> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(ChatError::store(format!("unknown message role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ToolInvocationState {
    Pending,
    Result { result: Value },
}

/// One tool call the model made, and its result once known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(rename = "args")]
    pub arguments: Value,
    #[serde(flatten)]
    pub state: ToolInvocationState,
}

impl ToolInvocation {
    pub fn pending(
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_call_id: tool_call_id.into(),
            arguments,
            state: ToolInvocationState::Pending,
        }
    }

    /// Moves a pending invocation to its result. Resolving twice is an error.
    pub fn resolve(&mut self, result: Value) -> Result<(), ChatError> {
        match self.state {
            ToolInvocationState::Pending => {
                self.state = ToolInvocationState::Result { result };
                Ok(())
            }
            ToolInvocationState::Result { .. } => Err(ChatError::tooling(format!(
                "tool call '{}' already has a result",
                self.tool_call_id
            ))),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ToolInvocationState::Pending)
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            ToolInvocationState::Pending => None,
            ToolInvocationState::Result { result } => Some(result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text { text: String },
    ToolInvocation(ToolInvocation),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ToolInvocation(_) => None,
                })
                .collect(),
        }
    }

    pub fn tool_invocations(&self) -> Vec<&ToolInvocation> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolInvocation(invocation) => Some(invocation),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }

    pub fn to_storage_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => serde_json::to_string(parts).unwrap_or_default(),
        }
    }

    /// Inverse of [`MessageContent::to_storage_string`]. Anything that is not
    /// a JSON part array is plain text.
    pub fn from_storage_string(stored: &str) -> Self {
        if stored.trim_start().starts_with('[')
            && let Ok(parts) = serde_json::from_str::<Vec<ContentPart>>(stored)
        {
            return Self::Parts(parts);
        }
        Self::Text(stored.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(conversation_id: ConversationId, role: MessageRole, content: MessageContent) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn text(&self) -> String {
        self.content.text()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            id: uuid_string(),
            user_id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.text.trim().is_empty() {
            return Err(ChatError::invalid_request("memory text must not be empty"));
        }
        if self.text.chars().count() > MEMORY_TEXT_MAX_CHARS {
            return Err(ChatError::invalid_request(format!(
                "memory text must be at most {MEMORY_TEXT_MAX_CHARS} characters"
            )));
        }
        Ok(())
    }
}

fn uuid_string() -> String {
    MessageId::generate().into_inner()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_chats: u64,
    pub total_pages: u64,
    pub is_last_page: bool,
}

impl Pagination {
    pub fn new(current_page: u32, page_size: u32, total_chats: u64) -> Self {
        let total_pages = total_chats.div_ceil(u64::from(page_size.max(1)));
        Self {
            current_page,
            page_size,
            total_chats,
            total_pages,
            is_last_page: u64::from(current_page) >= total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub chats: Vec<Conversation>,
    pub pagination: Pagination,
}

/// The authenticated caller, as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A message as the client sends it with a turn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,
}

impl IncomingMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
            tool_invocations: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
            tool_invocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub id: ConversationId,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
    /// Absent ids decode as empty and fail model resolution.
    #[serde(default)]
    pub model_id: String,
}

impl TurnRequest {
    pub fn new(
        id: impl Into<ConversationId>,
        model_id: impl Into<String>,
        messages: Vec<IncomingMessage>,
    ) -> Self {
        Self {
            id: id.into(),
            messages,
            model_id: model_id.into(),
        }
    }

    pub fn most_recent_user_message(&self) -> Option<&IncomingMessage> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::User)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    Validating,
    UserPersisted,
    Streaming,
    ToolDispatch,
    Finalizing,
    Done,
    Failed,
}

impl TurnPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::UserPersisted => "user_persisted",
            Self::Streaming => "streaming",
            Self::ToolDispatch => "tool_dispatch",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl Display for TurnPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_invocation_serializes_with_flat_state() {
        let mut invocation = ToolInvocation::pending("updateMemory", "c1", json!({"text": "tea"}));
        assert_eq!(
            serde_json::to_value(&invocation).expect("serialize"),
            json!({"toolName": "updateMemory", "toolCallId": "c1", "args": {"text": "tea"}, "state": "pending"})
        );

        invocation
            .resolve(json!({"message": "ok"}))
            .expect("resolve once");
        let value = serde_json::to_value(&invocation).expect("serialize");
        assert_eq!(value["state"], "result");
        assert_eq!(value["result"]["message"], "ok");
        assert!(!invocation.is_pending());
    }

    #[test]
    fn plain_text_that_looks_like_json_stays_text() {
        let content = MessageContent::from_storage_string("[not json");
        assert_eq!(content, MessageContent::Text("[not json".to_string()));
    }

    #[test]
    fn incoming_messages_accept_string_or_parts() {
        let request: TurnRequest = serde_json::from_value(json!({
            "id": "chat-1",
            "modelId": "Claude 3.5 Sonnet",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": [{"type": "text", "text": "hello"}]},
                {"role": "user", "content": "What is the weather in Lahore?"}
            ]
        }))
        .expect("parse request");

        assert_eq!(request.messages[1].content.text(), "hello");
        assert_eq!(
            request
                .most_recent_user_message()
                .map(|message| message.content.text()),
            Some("What is the weather in Lahore?".to_string())
        );
    }

    #[test]
    fn turn_request_defaults_missing_model_and_messages() {
        let request: TurnRequest =
            serde_json::from_value(json!({"id": "chat-1"})).expect("parse request");
        assert!(request.model_id.is_empty());
        assert!(request.messages.is_empty());
        assert!(serde_json::from_value::<TurnRequest>(json!({"modelId": "x"})).is_err());
    }

    #[test]
    fn pagination_reports_last_page() {
        let pagination = Pagination::new(2, 10, 15);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.is_last_page);

        let first = Pagination::new(1, 10, 15);
        assert!(!first.is_last_page);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.is_last_page);

        assert_eq!(
            serde_json::to_value(&first).expect("serialize")["totalChats"],
            15
        );
    }

    #[test]
    fn memory_records_enforce_length_limit() {
        let user = UserId::new("u1");
        assert!(MemoryRecord::new(user.clone(), "likes tea").validate().is_ok());
        assert!(
            MemoryRecord::new(user.clone(), "x".repeat(MEMORY_TEXT_MAX_CHARS))
                .validate()
                .is_ok()
        );
        assert!(
            MemoryRecord::new(user, "x".repeat(MEMORY_TEXT_MAX_CHARS + 1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn visibility_round_trips_lowercase() {
        assert_eq!(Visibility::parse("public").expect("public"), Visibility::Public);
        assert!(Visibility::parse("secret").is_err());
        assert_eq!(
            serde_json::to_value(Visibility::Private).expect("serialize"),
            json!("private")
        );
    }
}
