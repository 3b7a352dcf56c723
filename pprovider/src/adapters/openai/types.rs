//! What crosses the transport seam. Requests reuse the gateway's own
//! message and tool types; only the fields chat-completions understands are
//! kept.

use crate::{
    Message, ModelResponse, OutputItem, ProviderId, Role, StopReason, StreamEvent, TokenUsage,
    ToolCall, ToolDefinition,
};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    /// Prompt-cache breakpoint type, placed on the system prefix.
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiResponse {
    pub model: String,
    pub message: OpenAiAssistantMessage,
    pub finish_reason: StopReason,
    pub usage: TokenUsage,
}

impl OpenAiResponse {
    pub(crate) fn into_model_response(self, provider: ProviderId) -> ModelResponse {
        let OpenAiAssistantMessage {
            content,
            tool_calls,
        } = self.message;
        let text = (!content.is_empty())
            .then(|| OutputItem::Message(Message::new(Role::Assistant, content)));

        ModelResponse {
            provider,
            model: self.model,
            output: text
                .into_iter()
                .chain(tool_calls.into_iter().map(OutputItem::ToolCall))
                .collect(),
            stop_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenAiAssistantMessage {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAiStreamChunk {
    TextDelta(String),
    /// Emitted once per call after its argument fragments are complete.
    ToolCall(ToolCall),
    MessageComplete(OpenAiAssistantMessage),
    ResponseComplete(OpenAiResponse),
}

impl OpenAiStreamChunk {
    pub(crate) fn into_stream_event(self, provider: ProviderId) -> StreamEvent {
        match self {
            Self::TextDelta(delta) => StreamEvent::TextDelta(delta),
            Self::ToolCall(tool_call) => StreamEvent::ToolCallDelta(tool_call),
            Self::MessageComplete(message) => StreamEvent::MessageComplete(
                Message::assistant_with_tool_calls(message.content, message.tool_calls),
            ),
            Self::ResponseComplete(response) => {
                StreamEvent::ResponseComplete(response.into_model_response(provider))
            }
        }
    }
}
