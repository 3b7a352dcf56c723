//! Provider construction from API keys.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::{
    ModelCatalog, ModelGateway, ModelProvider, ProviderError, ProviderId, ProviderRegistry,
    SecureCredentialManager,
};

#[derive(Debug, Clone)]
pub struct ProviderBuildConfig {
    pub provider_id: ProviderId,
    pub api_key: String,
    /// Overrides the vendor's published chat-completions URL.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderBuildConfig {
    pub fn new(provider_id: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider_id,
            api_key: api_key.into(),
            base_url: None,
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub fn build_provider_from_api_key(
    provider_id: ProviderId,
    api_key: impl Into<String>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    build_provider_with_config(ProviderBuildConfig::new(provider_id, api_key))
}

pub fn build_provider_with_config(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let api_key = config.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ProviderError::authentication(
            "provider API key must not be empty",
        ));
    }

    let credentials = Arc::new(SecureCredentialManager::new());
    credentials.set_api_key(config.provider_id, api_key)?;
    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    build_openai_compatible(config.provider_id, credentials, http, config.base_url)
}

/// A gateway over the default catalog with one provider per config.
/// Later configs for the same provider replace earlier ones.
pub fn build_gateway(
    configs: impl IntoIterator<Item = ProviderBuildConfig>,
) -> Result<ModelGateway, ProviderError> {
    let mut registry = ProviderRegistry::new();
    for config in configs {
        let provider_id = config.provider_id;
        registry.register_shared(build_provider_with_config(config)?);
        tracing::debug!(provider = %provider_id, "registered model provider");
    }
    tracing::info!(families = ?registry.families(), "model gateway ready");
    Ok(ModelGateway::new(ModelCatalog::default(), registry))
}

#[cfg(feature = "provider-openai")]
fn build_openai_compatible(
    provider_id: ProviderId,
    credentials: Arc<SecureCredentialManager>,
    http: Client,
    base_url: Option<String>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use pprovider::adapters::openai::{
        OpenAiCompatibleProvider, OpenAiHttpTransport, default_base_url,
    };

    let base_url = base_url.unwrap_or_else(|| default_base_url(provider_id).to_string());
    let transport = Arc::new(OpenAiHttpTransport::new(http, base_url));
    Ok(Arc::new(OpenAiCompatibleProvider::new(
        provider_id,
        credentials,
        transport,
    )))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_compatible(
    _provider_id: ProviderId,
    _credentials: Arc<SecureCredentialManager>,
    _http: Client,
    _base_url: Option<String>,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-openai feature is not enabled on palaver",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn empty_keys_are_rejected() {
        let error = build_provider_from_api_key(ProviderId::OpenAi, "   ").err().expect("empty key");
        assert_eq!(error.kind, ProviderErrorKind::Authentication);
    }

    #[cfg(feature = "provider-openai")]
    #[test]
    fn gateway_registers_each_configured_provider() {
        let gateway = build_gateway([
            ProviderBuildConfig::new(ProviderId::OpenAi, "sk-test"),
            ProviderBuildConfig::new(ProviderId::Anthropic, "sk-ant-test")
                .with_base_url("http://127.0.0.1:9/v1")
                .with_timeout(Duration::from_secs(5)),
        ])
        .expect("gateway");

        assert_eq!(
            gateway.providers().families(),
            vec![ProviderId::OpenAi, ProviderId::Anthropic]
        );
        assert!(!gateway.providers().contains(ProviderId::Google));
        assert!(gateway.resolve("Claude 3.5 Sonnet").is_ok());
    }
}
