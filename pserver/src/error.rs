//! HTTP error responses.

use std::fmt::{Display, Formatter};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use palaver::ChatError;
use serde_json::json;

pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred while processing your request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    PlainText,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub format: ErrorFormat,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            format: ErrorFormat::PlainText,
        }
    }

    pub fn json(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message).with_format(ErrorFormat::Json)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn with_format(mut self, format: ErrorFormat) -> Self {
        self.format = format;
        self
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Client errors keep their message. Server errors are logged and replaced
/// with a generic message.
impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %error, "request failed");
            Self::new(status, INTERNAL_ERROR_MESSAGE)
        } else {
            Self::new(status, error.message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.format {
            ErrorFormat::PlainText => (self.status, self.message).into_response(),
            ErrorFormat::Json => {
                (self.status, Json(json!({ "error": self.message }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_status_codes() {
        let unauthorized = ApiError::from(ChatError::authorization("Unauthorized"));
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unauthorized.message, "Unauthorized");

        let missing = ApiError::from(ChatError::not_found("Model not found"));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "Model not found");

        let invalid = ApiError::from(ChatError::invalid_request("No user message found"));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_hide_details() {
        let store = ApiError::from(ChatError::store("disk on fire"));
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.message, INTERNAL_ERROR_MESSAGE);

        let provider = ApiError::from(ChatError::provider("upstream 503"));
        assert_eq!(provider.status, StatusCode::BAD_GATEWAY);
        assert_eq!(provider.message, INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn json_format_wraps_message() {
        let response = ApiError::json(StatusCode::BAD_REQUEST, "No file uploaded").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok()),
            Some("application/json")
        );
    }
}
