//! Model resolution and the request/response middleware chain.
//!
//! A [`ModelGateway`] turns a client-facing model id into a [`ModelHandle`]:
//! the catalog supplies the vendor api identifier, the identifier prefix picks
//! the provider family, and the registry supplies the provider instance.
//! Every call through the handle runs the configured middleware in order.
//!
//! ```rust
//! use pprovider::{ModelCatalog, ModelGateway, ProviderErrorKind, ProviderRegistry};
//!
//! let gateway = ModelGateway::new(ModelCatalog::default(), ProviderRegistry::new());
//! let err = gateway.resolve("unknown").err().expect("missing model");
//! assert_eq!(err.kind, ProviderErrorKind::UnsupportedModel);
//! ```

use std::sync::Arc;

use crate::{
    BoxedEventStream, ModelCatalog, ModelProvider, ModelRequest, ModelResponse, ModelSpec,
    NoopOperationHooks, ProviderError, ProviderId, ProviderOperationHooks, ProviderRegistry,
    RetryPolicy, provider_for_identifier,
};

pub trait ModelMiddleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform_request(&self, _provider: ProviderId, _request: &mut ModelRequest) {}

    fn transform_response(&self, _provider: ProviderId, _response: &mut ModelResponse) {}
}

/// Marks Anthropic requests for ephemeral prompt caching.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptCachingMiddleware;

impl PromptCachingMiddleware {
    pub const METADATA_KEY: &'static str = "cache_control";
    pub const METADATA_VALUE: &'static str = "ephemeral";
}

impl ModelMiddleware for PromptCachingMiddleware {
    fn name(&self) -> &'static str {
        "prompt_caching"
    }

    fn transform_request(&self, provider: ProviderId, request: &mut ModelRequest) {
        if provider == ProviderId::Anthropic {
            request
                .metadata
                .insert(Self::METADATA_KEY.to_string(), Self::METADATA_VALUE.to_string());
        }
    }
}

#[derive(Clone)]
pub struct ModelGateway {
    catalog: ModelCatalog,
    providers: ProviderRegistry,
    middleware: Vec<Arc<dyn ModelMiddleware>>,
}

impl ModelGateway {
    pub fn new(catalog: ModelCatalog, providers: ProviderRegistry) -> Self {
        Self {
            catalog,
            providers,
            middleware: vec![Arc::new(PromptCachingMiddleware)],
        }
    }

    pub fn without_middleware(mut self) -> Self {
        self.middleware.clear();
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn ModelMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn resolve(&self, model_id: &str) -> Result<ModelHandle, ProviderError> {
        let spec = self
            .catalog
            .find(model_id)
            .cloned()
            .ok_or_else(|| ProviderError::unsupported_model(model_id))?;
        let provider_id = provider_for_identifier(&spec.api_identifier)?;
        let provider = self.providers.get(provider_id).ok_or_else(|| {
            ProviderError::unsupported_model(format!(
                "{} (no '{provider_id}' provider configured)",
                spec.api_identifier
            ))
        })?;

        tracing::debug!(
            model_id = %model_id,
            api_identifier = %spec.api_identifier,
            provider = %provider_id,
            "resolved model"
        );

        Ok(ModelHandle {
            spec,
            provider_id,
            provider,
            middleware: self.middleware.clone(),
        })
    }
}

/// A resolved model bound to its provider and middleware chain.
#[derive(Clone)]
pub struct ModelHandle {
    spec: ModelSpec,
    provider_id: ProviderId,
    provider: Arc<dyn ModelProvider>,
    middleware: Vec<Arc<dyn ModelMiddleware>>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("spec", &self.spec)
            .field("provider_id", &self.provider_id)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ModelHandle {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    fn prepare(&self, mut request: ModelRequest) -> ModelRequest {
        request.model = self.spec.api_identifier.clone();
        for middleware in &self.middleware {
            middleware.transform_request(self.provider_id, &mut request);
        }
        request
    }

    pub async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let request = self.prepare(request);
        request.validate()?;

        let mut response = self.provider.complete(request).await?;
        for middleware in &self.middleware {
            middleware.transform_response(self.provider_id, &mut response);
        }
        Ok(response)
    }

    /// Runs `complete` under `policy`, sleeping between attempts with `sleep`.
    pub async fn complete_with_retry<Sleep, SleepFuture>(
        &self,
        request: ModelRequest,
        policy: &RetryPolicy,
        hooks: Option<&dyn ProviderOperationHooks>,
        sleep: Sleep,
    ) -> Result<ModelResponse, ProviderError>
    where
        Sleep: FnMut(std::time::Duration) -> SleepFuture,
        SleepFuture: std::future::Future<Output = ()>,
    {
        let hooks = hooks.unwrap_or(&NoopOperationHooks);
        policy
            .run(
                self.provider_id,
                "complete",
                hooks,
                |_| self.complete(request.clone()),
                sleep,
            )
            .await
    }

    pub async fn stream(
        &self,
        request: ModelRequest,
    ) -> Result<BoxedEventStream<'_>, ProviderError> {
        let mut request = self.prepare(request);
        request.options.stream = true;
        request.validate()?;
        self.provider.stream(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        Message, OutputItem, ProviderErrorKind, ProviderFuture, Role, StopReason, StreamEvent,
        TokenUsage, ScriptedEventStream,
    };

    struct RecordingProvider {
        id: ProviderId,
        seen: Arc<Mutex<Vec<ModelRequest>>>,
    }

    impl ModelProvider for RecordingProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn complete<'a>(
            &'a self,
            request: ModelRequest,
        ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
            Box::pin(async move {
                let model = request.model.clone();
                self.seen.lock().expect("seen lock").push(request);
                Ok(ModelResponse {
                    provider: self.id,
                    model,
                    output: vec![OutputItem::Message(Message::new(Role::Assistant, "ok"))],
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                })
            })
        }

        fn stream<'a>(
            &'a self,
            request: ModelRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async move {
                self.seen.lock().expect("seen lock").push(request);
                let stream: BoxedEventStream<'a> = Box::pin(ScriptedEventStream::new(vec![Ok(
                    StreamEvent::TextDelta("hi".to_string()),
                )]));
                Ok(stream)
            })
        }
    }

    fn gateway_with(id: ProviderId, seen: Arc<Mutex<Vec<ModelRequest>>>) -> ModelGateway {
        let mut providers = ProviderRegistry::new();
        providers.register(RecordingProvider { id, seen });
        let catalog = ModelCatalog::default().with_model(ModelSpec::new(
            "GPT 4o",
            "GPT 4o",
            "gpt-4o",
            "",
        ));
        ModelGateway::new(catalog, providers)
    }

    #[tokio::test]
    async fn resolved_handle_rewrites_model_and_applies_caching() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let gateway = gateway_with(ProviderId::Anthropic, Arc::clone(&seen));

        let handle = gateway.resolve("Claude 3.5 Sonnet").expect("resolve");
        assert_eq!(handle.provider_id(), ProviderId::Anthropic);

        let request = ModelRequest::new("Claude 3.5 Sonnet", vec![Message::new(Role::User, "hi")]);
        let response = handle.complete(request).await.expect("complete");
        assert_eq!(response.model, "claude-3-5-sonnet-20241022");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(
            seen[0].metadata.get("cache_control").map(String::as_str),
            Some("ephemeral")
        );
    }

    #[tokio::test]
    async fn caching_middleware_skips_other_providers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let gateway = gateway_with(ProviderId::OpenAi, Arc::clone(&seen));

        let handle = gateway.resolve("GPT 4o").expect("resolve");
        let _stream = handle
            .stream(ModelRequest::new("x", vec![Message::new(Role::User, "hi")]))
            .await
            .expect("stream");

        let seen = seen.lock().expect("seen lock");
        assert!(seen[0].options.stream);
        assert!(!seen[0].metadata.contains_key("cache_control"));
    }

    #[test]
    fn resolve_rejects_unknown_and_unregistered_models() {
        let gateway = gateway_with(ProviderId::OpenAi, Arc::new(Mutex::new(Vec::new())));

        let unknown = gateway.resolve("Mystery").expect_err("unknown id");
        assert_eq!(unknown.kind, ProviderErrorKind::UnsupportedModel);

        let unregistered = gateway
            .resolve("Claude 3.5 Sonnet")
            .expect_err("no anthropic provider");
        assert_eq!(unregistered.kind, ProviderErrorKind::UnsupportedModel);
    }
}
