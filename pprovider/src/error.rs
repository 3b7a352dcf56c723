//! Gateway failures.
//!
//! Whether a failure is worth another attempt follows from its kind alone,
//! so vendor adapters only pick the kind.
//!
//! ```rust
//! use pprovider::{ProviderError, ProviderErrorKind};
//!
//! assert!(!ProviderError::authentication("bad key").is_retryable());
//! assert!(ProviderError::from_status(529, "overloaded").is_retryable());
//!
//! let unknown = ProviderError::unsupported_model("llama-3");
//! assert_eq!(unknown.kind, ProviderErrorKind::UnsupportedModel);
//! assert_eq!(unknown.message, "Unsupported model: llama-3");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    UnsupportedModel,
    Timeout,
    Transport,
    Unavailable,
    Other,
}

impl ProviderErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Transport | Self::Unavailable
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a non-success vendor HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Authentication,
            429 => ProviderErrorKind::RateLimited,
            408 | 504 => ProviderErrorKind::Timeout,
            400 | 422 => ProviderErrorKind::InvalidRequest,
            404 => ProviderErrorKind::UnsupportedModel,
            502 | 503 | 529 => ProviderErrorKind::Unavailable,
            _ => ProviderErrorKind::Transport,
        };
        Self::new(kind, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    /// The identifier matched no catalog entry or no registered provider family.
    pub fn unsupported_model(model: impl Into<String>) -> Self {
        Self::new(
            ProviderErrorKind::UnsupportedModel,
            format!("Unsupported model: {}", model.into()),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}
