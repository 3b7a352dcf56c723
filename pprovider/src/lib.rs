//! Model gateway for palaver: provider-agnostic model types, the provider
//! trait and stream contract, catalog-based model resolution, a middleware
//! chain, retry policy, and an OpenAI-compatible HTTP adapter.
//!
//! ```rust
//! use pprovider::prelude::*;
//!
//! let request = ModelRequest::new("Claude 3.5 Sonnet", vec![Message::new(Role::User, "Hello")])
//!     .with_temperature(1.0);
//!
//! assert!(request.validate().is_ok());
//! assert_eq!(request.messages.len(), 1);
//! ```

pub mod adapters;
pub mod catalog;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod model;
pub mod prelude;
pub mod provider;
pub mod resilience;
pub mod stream;

pub use catalog::{ModelCatalog, ModelSpec, provider_for_identifier};
pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{ProviderError, ProviderErrorKind};
pub use gateway::{ModelGateway, ModelHandle, ModelMiddleware, PromptCachingMiddleware};
pub use model::{
    GenerationOptions, Message, ModelRequest, ModelResponse, OutputItem, ProviderId, Role,
    StopReason, TokenUsage, ToolCall, ToolDefinition, ToolResult,
};
pub use provider::{ModelProvider, ProviderFuture, ProviderRegistry};
pub use resilience::{NoopOperationHooks, ProviderOperationHooks, RetryPolicy};
pub use stream::{BoxedEventStream, ModelEventStream, ScriptedEventStream, StreamEvent};
