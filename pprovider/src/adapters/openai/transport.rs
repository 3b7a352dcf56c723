//! Transport trait and the reqwest + SSE implementation.

use std::collections::BTreeMap;
use std::pin::Pin;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response};

use crate::{ProviderError, ProviderFuture, SecretString, StopReason, TokenUsage, ToolCall};

use super::serde_api::{
    OpenAiApiResponse, OpenAiApiStreamResponse, build_api_request, extract_error_message,
    parse_finish_reason,
};
use super::types::{OpenAiAssistantMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(
        &self,
        request: OpenAiRequest,
        api_key: &SecretString,
    ) -> Result<Response, ProviderError> {
        let api_request = build_api_request(request)?;
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key.expose())
            .json(&api_request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("chat completion failed with status {status}"));

        ProviderError::from_status(status.as_u16(), message)
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let response = self.send(request, &api_key).await?;
            let parsed: OpenAiApiResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            OpenAiResponse::try_from(parsed)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        api_key: SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let model_for_fallback = request.model.clone();
            let response = self.send(request, &api_key).await?;

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut sse_buffer: Vec<u8> = Vec::new();
                let mut finished = false;
                let mut content = String::new();
                let mut tool_calls: BTreeMap<u32, ToolCall> = BTreeMap::new();
                let mut model = None::<String>;
                let mut finish_reason = StopReason::Other;
                let mut usage = TokenUsage::default();

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(|err| ProviderError::transport(err.to_string()))?;
                    sse_buffer.extend_from_slice(&bytes);

                    while let Some(newline_index) = sse_buffer.iter().position(|byte| *byte == b'\n') {
                        let line_bytes = sse_buffer.drain(..=newline_index).collect::<Vec<u8>>();
                        let line = String::from_utf8_lossy(&line_bytes);
                        let line = line.trim();

                        let Some(payload) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let payload = payload.trim();
                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let parsed: OpenAiApiStreamResponse = serde_json::from_str(payload)
                            .map_err(|err| ProviderError::transport(err.to_string()))?;

                        if model.is_none() {
                            model = parsed.model.clone();
                        }
                        if let Some(reported) = parsed.usage {
                            usage = reported.into();
                        }

                        let Some(choice) = parsed.choices.first() else {
                            continue;
                        };

                        if let Some(delta_content) = &choice.delta.content
                            && !delta_content.is_empty()
                        {
                            content.push_str(delta_content);
                            yield OpenAiStreamChunk::TextDelta(delta_content.clone());
                        }

                        for delta_call in choice.delta.tool_calls.iter().flatten() {
                            let index = delta_call.index.unwrap_or(0);
                            let entry = tool_calls.entry(index).or_insert_with(|| ToolCall {
                                id: format!("tool_call_{index}"),
                                name: String::new(),
                                arguments: String::new(),
                            });

                            if let Some(id) = &delta_call.id {
                                entry.id = id.clone();
                            }

                            if let Some(function) = &delta_call.function {
                                if let Some(name) = &function.name {
                                    entry.name = name.clone();
                                }
                                if let Some(arguments) = &function.arguments {
                                    entry.arguments.push_str(arguments);
                                }
                            }
                        }

                        if choice.finish_reason.is_some() {
                            finish_reason = parse_finish_reason(choice.finish_reason.as_deref());
                        }
                    }

                    if finished {
                        break;
                    }
                }

                let tool_calls = tool_calls.into_values().collect::<Vec<_>>();
                for tool_call in &tool_calls {
                    yield OpenAiStreamChunk::ToolCall(tool_call.clone());
                }

                let final_message = OpenAiAssistantMessage { content, tool_calls };
                yield OpenAiStreamChunk::MessageComplete(final_message.clone());
                yield OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
                    model: model.unwrap_or(model_for_fallback),
                    message: final_message,
                    finish_reason,
                    usage,
                });
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }
}
