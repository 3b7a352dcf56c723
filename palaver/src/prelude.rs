//! Common imports for most palaver applications.

pub use crate::{
    ObjectStoreConfig, ProviderBuildConfig, RuntimeBundle, RuntimeConfig, RuntimeParts,
    build_gateway, build_provider_from_api_key, build_runtime, build_runtime_with,
};
pub use crate::{
    ChatError, ChatErrorKind, ChatPolicy, ChatService, ChatStore, Conversation, ConversationId,
    ConversationPage, FramedEvent, IncomingMessage, MessageRole, ObjectStorage, ProviderId,
    StoreConfig, ToolKind, TurnRequest, TurnStream, UserIdentity, UserId, Visibility,
};
