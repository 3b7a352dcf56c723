//! Unified facade over the palaver workspace crates.
//!
//! Most applications depend on this crate alone. It re-exports the chat,
//! provider, tooling, store, and observability crates and wires them
//! together with [`build_runtime`].
//!
//! ```rust
//! use palaver::prelude::*;
//!
//! let runtime = build_runtime(RuntimeConfig::default()).expect("in-memory runtime");
//! assert_eq!(runtime.chat.policy().max_steps, 5);
//! ```

pub mod prelude;
pub mod providers;
pub mod runtime;

pub use pchat;
pub use pcommon;
pub use pobserve;
pub use pprovider;
pub use pstore;
pub use ptooling;

pub use pchat::{
    ChatError, ChatErrorKind, ChatErrorSource, ChatMessage, ChatPolicy, ChatService,
    ChatServiceBuilder, ChatStore, ContentPart, Conversation, ConversationPage, FrameDecoder,
    FramedEvent, InMemoryChatStore, InMemoryObjectStorage, IncomingMessage, MemoryRecord,
    MessageContent, MessageRole, ModelTitleGenerator, ObjectStorage, Pagination, StoredObject,
    ToolInvocation, ToolResultFrame, TurnHooks, TurnPhase, TurnRequest, TurnStream,
    UserIdentity, Visibility, encode_ndjson,
};
pub use pcommon::{BoxFuture, ConversationId, MessageId, MetadataMap, TraceId, UserId};
pub use pobserve::{
    MetricsObservabilityHooks, ObservabilityHooks, SafeProviderHooks, SafeToolHooks,
    SafeTurnHooks, TracingObservabilityHooks,
};
pub use pprovider::{
    BoxedEventStream, Message, ModelCatalog, ModelGateway, ModelHandle, ModelProvider,
    ModelRequest, ModelResponse, ModelSpec, OutputItem, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry, RetryPolicy, Role,
    ScriptedEventStream, SecretString, SecureCredentialManager, StopReason, StreamEvent,
    TokenUsage, ToolCall, ToolDefinition,
};
pub use pstore::{
    FilesystemObjectStorage, PostgresChatStore, PostgresStoreConfig, SqliteChatStore,
    StoreConfig, StoreError, StoreErrorKind, create_chat_store,
};
pub use ptooling::{
    DEFAULT_TOOL_TIMEOUT, DefaultToolRuntime, Tool, ToolError, ToolErrorKind, ToolEvent,
    ToolExecutionContext, ToolExecutionResult, ToolKind, ToolOutcome, ToolRegistry, ToolRuntime,
    ToolRuntimeHooks,
};

pub use providers::{
    ProviderBuildConfig, build_gateway, build_provider_from_api_key, build_provider_with_config,
};
pub use runtime::{
    ObjectStoreConfig, RuntimeBundle, RuntimeConfig, RuntimeParts, build_runtime,
    build_runtime_with, create_object_storage,
};
