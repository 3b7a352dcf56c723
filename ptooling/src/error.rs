//! Why a tool call produced no output of its own.
//!
//! These never leave the runtime: they become failure outcomes the model
//! reads as the tool's result.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pprovider::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    NotFound,
    InvalidArguments,
    Execution,
    Panicked,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn panicked(tool_name: &str) -> Self {
        Self::new(ToolErrorKind::Panicked, format!("tool '{tool_name}' panicked"))
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    pub fn for_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn for_call(self, call: &ToolCall) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            ..self.for_tool(call.name.clone())
        }
    }

    /// The model asked for something unusable and can correct itself on the
    /// next step.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::NotFound | ToolErrorKind::InvalidArguments
        )
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(tool_name) = &self.tool_name {
            write!(f, "{tool_name}")?;
            if let Some(id) = &self.tool_call_id {
                write!(f, "#{id}")?;
            }
            write!(f, " ")?;
        }
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_faults_are_classified() {
        assert!(ToolError::invalid_arguments("bad").is_caller_fault());
        assert!(ToolError::not_found("nope").is_caller_fault());
        assert!(!ToolError::timeout("slow").is_caller_fault());
        assert!(!ToolError::panicked("getWeather").is_caller_fault());
    }

    #[test]
    fn display_names_the_call() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "getWeather".into(),
            arguments: "{}".into(),
        };

        assert_eq!(
            ToolError::timeout("too slow").for_call(&call).to_string(),
            "getWeather#call_1 Timeout: too slow"
        );
        assert_eq!(
            ToolError::not_found("gone").for_tool("search").to_string(),
            "search NotFound: gone"
        );
    }
}
