//! Chat-layer errors and classification.
//!
//! ```rust
//! use pchat::{ChatError, ChatErrorKind, TurnPhase};
//!
//! let err = ChatError::store("disk full").in_phase(TurnPhase::Finalizing);
//! assert_eq!(err.kind, ChatErrorKind::Store);
//! assert_eq!(err.status_code(), 500);
//! assert!(!err.is_user_error());
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use pprovider::{ProviderError, ProviderErrorKind};
use ptooling::{ToolError, ToolErrorKind};

use crate::TurnPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    Authentication,
    Authorization,
    NotFound,
    InvalidRequest,
    Tooling,
    Store,
    Provider,
}

/// Lower-layer classification carried along for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorSource {
    Provider(ProviderErrorKind),
    Tool(ToolErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub phase: Option<TurnPhase>,
    pub source: Option<ChatErrorSource>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Authorization, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn in_phase(mut self, phase: TurnPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_source(mut self, source: ChatErrorSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::Authentication
                | ChatErrorKind::Authorization
                | ChatErrorKind::NotFound
                | ChatErrorKind::InvalidRequest
        )
    }

    /// HTTP status the error maps to at the service edge.
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ChatErrorKind::Authentication | ChatErrorKind::Authorization => 401,
            ChatErrorKind::NotFound => 404,
            ChatErrorKind::InvalidRequest => 400,
            ChatErrorKind::Tooling | ChatErrorKind::Store => 500,
            ChatErrorKind::Provider => 502,
        }
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            Some(phase) => write!(f, "{:?} [phase={phase}]: {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::UnsupportedModel => ChatErrorKind::NotFound,
            ProviderErrorKind::InvalidRequest => ChatErrorKind::InvalidRequest,
            _ => ChatErrorKind::Provider,
        };
        ChatError::new(kind, value.message).with_source(ChatErrorSource::Provider(value.kind))
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        ChatError::tooling(value.to_string()).with_source(ChatErrorSource::Tool(value.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_taxonomy() {
        assert_eq!(ChatError::authentication("x").status_code(), 401);
        assert_eq!(ChatError::authorization("x").status_code(), 401);
        assert_eq!(ChatError::not_found("x").status_code(), 404);
        assert_eq!(ChatError::invalid_request("x").status_code(), 400);
        assert_eq!(ChatError::tooling("x").status_code(), 500);
        assert_eq!(ChatError::store("x").status_code(), 500);
        assert_eq!(ChatError::provider("x").status_code(), 502);
    }

    #[test]
    fn unsupported_model_maps_to_not_found() {
        let err = ChatError::from(ProviderError::unsupported_model("nope"));
        assert_eq!(err.kind, ChatErrorKind::NotFound);
        assert_eq!(
            err.source,
            Some(ChatErrorSource::Provider(ProviderErrorKind::UnsupportedModel))
        );

        let upstream = ChatError::from(ProviderError::unavailable("overloaded"));
        assert_eq!(upstream.kind, ChatErrorKind::Provider);
    }

    #[test]
    fn display_includes_phase_when_known() {
        let err = ChatError::store("write failed").in_phase(TurnPhase::Finalizing);
        assert_eq!(err.to_string(), "Store [phase=finalizing]: write failed");
    }
}
