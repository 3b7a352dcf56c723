//! Vendor families and the table the gateway dispatches through.
//!
//! ```rust
//! use pprovider::{ProviderId, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.families().is_empty());
//! assert!(!registry.contains(ProviderId::OpenAi));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pcommon::Registry;

use crate::{BoxedEventStream, ModelRequest, ModelResponse, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One model vendor family. `request.model` is always the vendor's own
/// api identifier by the time it reaches an implementation.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}

/// At most one provider per family; registering a family again replaces it.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    by_family: Registry<ProviderId, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, provider: P)
    where
        P: ModelProvider + 'static,
    {
        self.register_shared(Arc::new(provider));
    }

    pub fn register_shared(&mut self, provider: Arc<dyn ModelProvider>) {
        let family = provider.id();
        if self.by_family.insert(family, provider).is_some() {
            tracing::debug!(provider = %family, "replaced provider registration");
        }
    }

    pub fn get(&self, family: ProviderId) -> Option<Arc<dyn ModelProvider>> {
        self.by_family.get(&family).cloned()
    }

    pub fn contains(&self, family: ProviderId) -> bool {
        self.by_family.contains_key(&family)
    }

    /// Registered families in declaration order.
    pub fn families(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|family| self.contains(*family))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptedEventStream, StopReason, TokenUsage};

    struct Fixed(ProviderId, &'static str);

    impl ModelProvider for Fixed {
        fn id(&self) -> ProviderId {
            self.0
        }

        fn complete<'a>(
            &'a self,
            request: ModelRequest,
        ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
            Box::pin(async move {
                Ok(ModelResponse {
                    provider: self.0,
                    model: format!("{}:{}", self.1, request.model),
                    output: Vec::new(),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                })
            })
        }

        fn stream<'a>(
            &'a self,
            _request: ModelRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async {
                let empty = ScriptedEventStream::new(Vec::new());
                Ok(Box::pin(empty) as BoxedEventStream<'a>)
            })
        }
    }

    #[tokio::test]
    async fn registering_a_family_again_replaces_it() {
        let mut registry = ProviderRegistry::new();
        registry.register(Fixed(ProviderId::Google, "first"));
        registry.register(Fixed(ProviderId::OpenAi, "other"));
        registry.register(Fixed(ProviderId::Google, "second"));

        assert_eq!(registry.families(), vec![ProviderId::OpenAi, ProviderId::Google]);
        let google = registry.get(ProviderId::Google).expect("google registered");
        let response = google
            .complete(ModelRequest::new("gemini", Vec::new()))
            .await
            .expect("fixed provider answers");
        assert_eq!(response.model, "second:gemini");
        assert!(!registry.contains(ProviderId::Anthropic));
    }
}
