//! `ModelProvider` over an OpenAI-compatible transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, ModelProvider, ModelRequest, ModelResponse, PromptCachingMiddleware,
    ProviderError, ProviderFuture, ProviderId, SecretString, SecureCredentialManager,
};

use super::transport::OpenAiTransport;
use super::types::OpenAiRequest;

/// The chat-completions base URL each vendor publishes.
pub fn default_base_url(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAi => "https://api.openai.com/v1",
        ProviderId::Anthropic => "https://api.anthropic.com/v1",
        ProviderId::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiCompatibleProvider {
    id: ProviderId,
    credentials: Arc<SecureCredentialManager>,
    transport: Arc<dyn OpenAiTransport>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        id: ProviderId,
        credentials: Arc<SecureCredentialManager>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        Self {
            id,
            credentials,
            transport,
        }
    }

    fn api_key(&self) -> Result<SecretString, ProviderError> {
        self.credentials.api_key(self.id)?.ok_or_else(|| {
            ProviderError::authentication(format!("no API key configured for '{}'", self.id))
        })
    }

    pub(crate) fn build_request(&self, request: ModelRequest, stream: bool) -> OpenAiRequest {
        let cache_control = request
            .metadata
            .get(PromptCachingMiddleware::METADATA_KEY)
            .cloned();
        OpenAiRequest {
            model: request.model,
            messages: request.messages,
            tools: request.tools,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream,
            cache_control,
        }
    }
}

impl ModelProvider for OpenAiCompatibleProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.api_key()?;
            let wire_request = self.build_request(request, false);
            let response = self.transport.complete(wire_request, api_key).await?;
            Ok(response.into_model_response(self.id))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.api_key()?;
            let wire_request = self.build_request(request, true);
            let mut chunks = self.transport.stream(wire_request, api_key).await?;
            let provider = self.id;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield chunk?.into_stream_event(provider);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
