#![cfg(feature = "provider-openai")]

use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use pprovider::adapters::openai::{
    OpenAiAssistantMessage, OpenAiChunkStream, OpenAiCompatibleProvider, OpenAiRequest,
    OpenAiResponse, OpenAiStreamChunk, OpenAiTransport,
};
use pprovider::{
    Message, ModelCatalog, ModelGateway, ModelProvider, ModelRequest, ProviderError,
    ProviderFuture, ProviderId, ProviderRegistry, Role, SecretString, SecureCredentialManager,
    StopReason, StreamEvent, TokenUsage, ToolCall,
};

#[derive(Debug, Default)]
struct FakeTransport {
    seen: Mutex<Vec<(OpenAiRequest, String)>>,
}

impl FakeTransport {
    fn record(&self, request: OpenAiRequest, api_key: &SecretString) {
        self.seen
            .lock()
            .expect("seen lock")
            .push((request, api_key.expose().to_string()));
    }
}

impl OpenAiTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            let model = request.model.clone();
            self.record(request, &api_key);
            Ok(OpenAiResponse {
                model,
                message: OpenAiAssistantMessage {
                    content: "Weather in Lahore".to_string(),
                    tool_calls: Vec::new(),
                },
                finish_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 3,
                    output_tokens: 4,
                    total_tokens: 7,
                },
            })
        })
    }

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let model = request.model.clone();
            self.record(request, &api_key);
            let call = ToolCall {
                id: "call_7".to_string(),
                name: "getWeather".to_string(),
                arguments: "{\"latitude\":31.5,\"longitude\":74.3}".to_string(),
            };
            let message = OpenAiAssistantMessage {
                content: "Let me check.".to_string(),
                tool_calls: vec![call.clone()],
            };
            let chunks = vec![
                Ok(OpenAiStreamChunk::TextDelta("Let me ".to_string())),
                Ok(OpenAiStreamChunk::TextDelta("check.".to_string())),
                Ok(OpenAiStreamChunk::ToolCall(call)),
                Ok(OpenAiStreamChunk::MessageComplete(message.clone())),
                Ok(OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
                    model,
                    message,
                    finish_reason: StopReason::ToolUse,
                    usage: TokenUsage::default(),
                })),
            ];
            Ok(Box::pin(stream::iter(chunks)) as OpenAiChunkStream<'a>)
        })
    }
}

fn credentials() -> Arc<SecureCredentialManager> {
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials
        .set_api_key(ProviderId::Anthropic, "sk-ant-integration")
        .expect("key should set");
    credentials
}

#[tokio::test]
async fn complete_uses_provider_key_and_maps_usage() {
    let transport = Arc::new(FakeTransport::default());
    let provider =
        OpenAiCompatibleProvider::new(ProviderId::Anthropic, credentials(), transport.clone());

    let response = provider
        .complete(
            ModelRequest::new("claude-3-5-sonnet-20241022", vec![Message::new(Role::User, "hi")])
                .with_temperature(1.0),
        )
        .await
        .expect("complete should succeed");

    assert_eq!(response.provider, ProviderId::Anthropic);
    assert_eq!(response.text(), "Weather in Lahore");
    assert_eq!(response.usage.total_tokens, 7);

    let seen = transport.seen.lock().expect("seen lock");
    assert_eq!(seen[0].1, "sk-ant-integration");
    assert_eq!(seen[0].0.temperature, Some(1.0));
    assert!(!seen[0].0.stream);
}

#[tokio::test]
async fn gateway_stream_yields_text_then_tool_call_then_completion() {
    let transport = Arc::new(FakeTransport::default());
    let mut providers = ProviderRegistry::new();
    providers.register(OpenAiCompatibleProvider::new(
        ProviderId::Anthropic,
        credentials(),
        transport.clone(),
    ));
    let gateway = ModelGateway::new(ModelCatalog::default(), providers);

    let handle = gateway.resolve("Claude 3.5 Sonnet").expect("resolve");
    let events = handle
        .stream(ModelRequest::new(
            "ignored",
            vec![Message::new(Role::User, "weather in Lahore?")],
        ))
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], Ok(StreamEvent::TextDelta(delta)) if delta == "Let me "));
    assert!(
        matches!(&events[2], Ok(StreamEvent::ToolCallDelta(call)) if call.name == "getWeather")
    );
    match &events[4] {
        Ok(StreamEvent::ResponseComplete(response)) => {
            assert_eq!(response.stop_reason, StopReason::ToolUse);
            assert_eq!(response.model, "claude-3-5-sonnet-20241022");
        }
        other => panic!("unexpected final event: {other:?}"),
    }

    let seen = transport.seen.lock().expect("seen lock");
    assert_eq!(seen[0].0.model, "claude-3-5-sonnet-20241022");
    assert!(seen[0].0.stream);
}
