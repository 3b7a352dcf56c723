//! Unit tests for adapter internals.

#![cfg(test)]

use std::sync::Arc;

use futures_util::stream;

use crate::{
    Message, ModelMiddleware, ModelRequest, PromptCachingMiddleware, ProviderError,
    ProviderFuture, ProviderId, Role, SecretString, SecureCredentialManager, StopReason, ToolCall,
    ToolResult,
};

use super::provider::{OpenAiCompatibleProvider, default_base_url};
use super::serde_api::{OpenAiApiResponse, build_api_request, parse_finish_reason};
use super::transport::{OpenAiChunkStream, OpenAiTransport};
use super::types::{OpenAiRequest, OpenAiResponse};

#[derive(Debug)]
struct NoopTransport;

impl OpenAiTransport for NoopTransport {
    fn complete<'a>(
        &'a self,
        _request: OpenAiRequest,
        _api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::other("not used")) })
    }

    fn stream<'a>(
        &'a self,
        _request: OpenAiRequest,
        _api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            let output = stream::iter(vec![Err(ProviderError::other("not used"))]);
            Ok(Box::pin(output) as OpenAiChunkStream<'a>)
        })
    }
}

fn provider() -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new(
        ProviderId::Anthropic,
        Arc::new(SecureCredentialManager::new()),
        Arc::new(NoopTransport),
    )
}

#[test]
fn tool_round_trip_messages_keep_call_ids() {
    let call = ToolCall {
        id: "call_1".to_string(),
        name: "getWeather".to_string(),
        arguments: "{\"latitude\":1,\"longitude\":2}".to_string(),
    };
    let request = ModelRequest::new(
        "claude-3-5-sonnet-20241022",
        vec![
            Message::new(Role::User, "weather?"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool_result(ToolResult {
                tool_call_id: "call_1".to_string(),
                output: "{\"ok\":true}".to_string(),
            }),
        ],
    );

    let built = provider().build_request(request, true);
    assert_eq!(built.messages.len(), 3);
    assert_eq!(built.messages[1].tool_calls.len(), 1);
    assert_eq!(built.messages[2].role, Role::Tool);
    assert_eq!(built.messages[2].tool_call_id.as_deref(), Some("call_1"));

    let api = build_api_request(built).expect("api request");
    let json = serde_json::to_value(&api).expect("serialize");
    assert!(json["messages"][1]["content"].is_null());
    assert_eq!(json["messages"][1]["tool_calls"][0]["type"], "function");
    assert_eq!(json["messages"][2]["tool_call_id"], "call_1");
}

#[test]
fn prompt_caching_reaches_the_serialized_system_message() {
    let mut request = ModelRequest::new(
        "claude-3-5-sonnet-20241022",
        vec![
            Message::new(Role::System, "You are a friendly assistant."),
            Message::new(Role::User, "hello"),
        ],
    );
    PromptCachingMiddleware.transform_request(ProviderId::Anthropic, &mut request);

    let built = provider().build_request(request, true);
    assert_eq!(built.cache_control.as_deref(), Some("ephemeral"));

    let json = serde_json::to_value(build_api_request(built).expect("api request"))
        .expect("serialize");
    assert_eq!(json["messages"][0]["cache_control"]["type"], "ephemeral");
    assert!(json["messages"][1].get("cache_control").is_none());
}

#[test]
fn requests_without_caching_carry_no_cache_control() {
    let mut request = ModelRequest::new("gpt-4o", vec![Message::new(Role::User, "hello")]);
    PromptCachingMiddleware.transform_request(ProviderId::OpenAi, &mut request);

    let built = provider().build_request(request, false);
    assert!(built.cache_control.is_none());

    let json = serde_json::to_value(build_api_request(built).expect("api request"))
        .expect("serialize");
    assert!(json["messages"][0].get("cache_control").is_none());
}

#[test]
fn empty_user_content_is_rejected() {
    let request = ModelRequest::new("gpt-4o", vec![Message::new(Role::User, "  ")]);
    let built = provider().build_request(request, false);
    assert!(build_api_request(built).is_err());
}

#[test]
fn parse_finish_reason_maps_vendor_values() {
    assert_eq!(parse_finish_reason(Some("stop")), StopReason::EndTurn);
    assert_eq!(parse_finish_reason(Some("end_turn")), StopReason::EndTurn);
    assert_eq!(parse_finish_reason(Some("tool_calls")), StopReason::ToolUse);
    assert_eq!(parse_finish_reason(Some("length")), StopReason::MaxTokens);
    assert_eq!(parse_finish_reason(None), StopReason::Other);
}

#[test]
fn completion_payload_parses_tool_calls() {
    let body = r#"{
        "model": "gpt-4o",
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{"id": "c1", "type": "function", "function": {"name": "updateMemory", "arguments": "{\"text\":\"likes tea\"}"}}]
            },
            "finish_reason": "tool_calls"
        }]
    }"#;

    let parsed: OpenAiApiResponse = serde_json::from_str(body).expect("parse body");
    let response = OpenAiResponse::try_from(parsed).expect("convert");
    assert_eq!(response.finish_reason, StopReason::ToolUse);
    assert_eq!(response.message.tool_calls[0].name, "updateMemory");
    assert_eq!(response.usage.total_tokens, 0);
}

#[test]
fn default_base_urls_cover_every_provider() {
    for provider in ProviderId::ALL {
        assert!(default_base_url(provider).starts_with("https://"));
    }
}

#[tokio::test]
async fn missing_api_key_is_an_authentication_error() {
    use crate::{ModelProvider, ProviderErrorKind};

    let err = provider()
        .complete(ModelRequest::new(
            "claude-3-5-sonnet-20241022",
            vec![Message::new(Role::User, "hi")],
        ))
        .await
        .expect_err("no key configured");
    assert_eq!(err.kind, ProviderErrorKind::Authentication);
}
