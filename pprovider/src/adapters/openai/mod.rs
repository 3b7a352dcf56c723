//! OpenAI-compatible chat-completions adapter.
//!
//! OpenAI, Anthropic, and Google all expose this wire format, so one adapter
//! serves every provider family; only the base URL and API key differ.

mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::{OpenAiCompatibleProvider, default_base_url};
pub use transport::{OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport};
pub use types::{OpenAiAssistantMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};
