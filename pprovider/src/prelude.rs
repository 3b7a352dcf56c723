//! Common `pprovider` imports for downstream crates.

pub use crate::{
    BoxedEventStream, Message, ModelCatalog, ModelEventStream, ModelGateway, ModelHandle,
    ModelProvider, ModelRequest, ModelResponse, ModelSpec, OutputItem, ProviderError,
    ProviderErrorKind, ProviderFuture, ProviderId, ProviderRegistry, RetryPolicy, Role,
    ScriptedEventStream, StopReason, StreamEvent, TokenUsage, ToolCall, ToolDefinition, ToolResult,
};
pub use pcommon::{BoxFuture, MetadataMap};
