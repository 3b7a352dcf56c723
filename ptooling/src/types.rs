//! Tool execution context and outcome types.

use pcommon::{ConversationId, MetadataMap, TraceId, UserId};
use pprovider::ToolResult;
use serde_json::{Value, json};

/// Ambient data every tool call runs with.
///
/// `user_id` comes from the authenticated identity, never from tool
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub conversation_id: ConversationId,
    pub user_id: Option<UserId>,
    pub trace_id: Option<TraceId>,
    pub metadata: MetadataMap,
}

impl ToolExecutionContext {
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: None,
            trace_id: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// What a tool produced. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    pub fn success(value: Value) -> Self {
        Self::Success(value)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The JSON the model and the client see. Failures render as `{"error": msg}`.
    pub fn payload(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Failure(message) => json!({ "error": message }),
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            Self::Success(value) => value,
            Self::Failure(message) => json!({ "error": message }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub outcome: ToolOutcome,
}

impl ToolExecutionResult {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        outcome: ToolOutcome,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            outcome,
        }
    }

    pub fn into_tool_result(self) -> ToolResult {
        ToolResult {
            tool_call_id: self.tool_call_id,
            output: self.outcome.into_payload().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_payload_wraps_message_in_error_field() {
        let outcome = ToolOutcome::failure("Failed to memorize text.");
        assert!(!outcome.is_success());
        assert_eq!(outcome.payload(), json!({"error": "Failed to memorize text."}));
    }

    #[test]
    fn tool_result_output_is_serialized_payload() {
        let result = ToolExecutionResult::new(
            "call_1",
            "getWeather",
            ToolOutcome::success(json!({"current": {"temperature_2m": 21.4}})),
        );

        let tool_result = result.into_tool_result();
        assert_eq!(tool_result.tool_call_id, "call_1");
        assert_eq!(tool_result.output, r#"{"current":{"temperature_2m":21.4}}"#);
    }
}
