//! Chat turn orchestration for palaver.
//!
//! [`ChatService`] validates a turn, persists the user message, streams the
//! model's reply as [`FramedEvent`]s, runs requested tools between model
//! steps, and persists the assistant messages. If persistence fails after
//! generation the user message is deleted again.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pchat::prelude::*;
//! use pprovider::{ModelCatalog, ModelGateway, ProviderRegistry};
//!
//! let gateway = Arc::new(ModelGateway::new(ModelCatalog::default(), ProviderRegistry::new()));
//! let store: Arc<dyn ChatStore> = Arc::new(InMemoryChatStore::new());
//! let service = ChatService::builder(gateway, store)
//!     .policy(ChatPolicy::default().with_max_steps(3))
//!     .build()
//!     .expect("policy is valid");
//! assert_eq!(service.policy().max_steps, 3);
//! ```

mod error;
mod framing;
mod hooks;
mod policy;
mod service;
mod store;
mod title;
pub mod tools;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatMessage, ChatPolicy, ChatService, ChatStore, Conversation,
        FramedEvent, InMemoryChatStore, InMemoryObjectStorage, IncomingMessage, MessageContent,
        MessageRole, ObjectStorage, TurnRequest, TurnStream, UserIdentity, Visibility,
    };
}

pub use error::{ChatError, ChatErrorKind, ChatErrorSource};
pub use framing::{FrameDecoder, FramedEvent, ToolResultFrame, TurnStream, encode_ndjson};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use policy::{ChatPolicy, DEFAULT_SYSTEM_PROMPT};
pub use service::{
    ChatService, ChatServiceBuilder, DEFAULT_HISTORY_PAGE_SIZE, MAX_HISTORY_PAGE_SIZE,
};
pub use store::{
    ChatStore, InMemoryChatStore, InMemoryObjectStorage, ObjectStorage, StoredObject, page_offset,
};
pub use title::{
    FallbackTitleGenerator, MAX_TITLE_CHARS, ModelTitleGenerator, TitleGenerator, truncate_title,
};
pub use types::{
    ChatMessage, ContentPart, Conversation, ConversationPage, IncomingMessage,
    MEMORY_TEXT_MAX_CHARS, MemoryRecord, MessageContent, MessageRole, Pagination, ToolInvocation,
    ToolInvocationState, TurnPhase, TurnRequest, UserIdentity, Visibility,
};
