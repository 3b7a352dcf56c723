//! Wire payloads for the chat-completions endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Message, ProviderError, Role, StopReason, TokenUsage, ToolCall, ToolDefinition};

use super::types::{OpenAiAssistantMessage, OpenAiRequest, OpenAiResponse};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    let mut messages = request
        .messages
        .into_iter()
        .map(OpenAiApiMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(kind) = request.cache_control {
        mark_cache_breakpoints(&mut messages, &kind);
    }

    if messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "chat completion request requires at least one message",
        ));
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .into_iter()
                .map(OpenAiApiTool::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    Ok(OpenAiApiRequest {
        model: request.model,
        messages,
        tools,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
    })
}

/// Marks every system message, or the first message when there is no system
/// prompt.
fn mark_cache_breakpoints(messages: &mut [OpenAiApiMessage], kind: &str) {
    let mut marked = false;
    for message in messages.iter_mut().filter(|message| message.role == "system") {
        message.cache_control = Some(OpenAiApiCacheControl::new(kind));
        marked = true;
    }
    if !marked && let Some(first) = messages.first_mut() {
        first.cache_control = Some(OpenAiApiCacheControl::new(kind));
    }
}

/// Accepts both the OpenAI spellings and the Anthropic ones some
/// compatibility layers pass through.
pub(crate) fn parse_finish_reason(value: Option<&str>) -> StopReason {
    match value {
        Some("stop" | "end_turn") => StopReason::EndTurn,
        Some("length" | "max_tokens") => StopReason::MaxTokens,
        Some("tool_calls" | "tool_use") => StopReason::ToolUse,
        Some("cancelled") => StopReason::Cancelled,
        _ => StopReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<OpenAiApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiErrorEnvelope {
    pub error: OpenAiApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiApiOutboundToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<OpenAiApiCacheControl>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiCacheControl {
    pub r#type: String,
}

impl OpenAiApiCacheControl {
    fn new(kind: &str) -> Self {
        Self {
            r#type: kind.to_string(),
        }
    }
}

impl TryFrom<Message> for OpenAiApiMessage {
    type Error = ProviderError;

    fn try_from(value: Message) -> Result<Self, Self::Error> {
        let has_tool_calls = !value.tool_calls.is_empty();
        if value.content.trim().is_empty() && value.role != Role::Assistant {
            return Err(ProviderError::invalid_request(
                "message content must not be empty",
            ));
        }

        if value.role == Role::Tool && value.tool_call_id.is_none() {
            return Err(ProviderError::invalid_request(
                "tool messages must reference a tool call id",
            ));
        }

        let content = if value.content.is_empty() && has_tool_calls {
            None
        } else {
            Some(value.content)
        };

        let tool_calls = has_tool_calls.then(|| {
            value
                .tool_calls
                .into_iter()
                .map(OpenAiApiOutboundToolCall::from)
                .collect()
        });

        Ok(Self {
            role: value.role.as_str(),
            content,
            tool_calls,
            tool_call_id: value.tool_call_id,
            cache_control: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiOutboundToolCall {
    pub id: String,
    pub r#type: &'static str,
    pub function: OpenAiApiToolFunction,
}

impl From<ToolCall> for OpenAiApiOutboundToolCall {
    fn from(value: ToolCall) -> Self {
        Self {
            id: value.id,
            r#type: "function",
            function: OpenAiApiToolFunction {
                name: value.name,
                arguments: value.arguments,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiTool {
    pub r#type: &'static str,
    pub function: OpenAiApiFunction,
}

impl TryFrom<ToolDefinition> for OpenAiApiTool {
    type Error = ProviderError;

    fn try_from(value: ToolDefinition) -> Result<Self, Self::Error> {
        let parameters = serde_json::from_str::<Value>(&value.input_schema)
            .map_err(|_| ProviderError::invalid_request("tool schema must be valid JSON"))?;

        Ok(Self {
            r#type: "function",
            function: OpenAiApiFunction {
                name: value.name,
                description: value.description,
                parameters,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    pub model: String,
    pub choices: Vec<OpenAiApiChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    pub message: OpenAiApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiAssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiApiToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiToolCall {
    pub id: String,
    pub function: OpenAiApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenAiApiToolFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<OpenAiApiUsage> for TokenUsage {
    fn from(value: OpenAiApiUsage) -> Self {
        Self {
            input_tokens: value.prompt_tokens,
            output_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

impl TryFrom<OpenAiApiResponse> for OpenAiResponse {
    type Error = ProviderError;

    fn try_from(value: OpenAiApiResponse) -> Result<Self, Self::Error> {
        let choice = value
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::transport("completion response did not include choices"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();

        Ok(Self {
            model: value.model,
            message: OpenAiAssistantMessage {
                content: choice.message.content.unwrap_or_default(),
                tool_calls,
            },
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage: value.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiApiStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    pub delta: OpenAiApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamDelta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiDeltaToolCall {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub function: Option<OpenAiApiDeltaToolFunction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiDeltaToolFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
