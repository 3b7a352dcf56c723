//! Model catalog and identifier-prefix routing.
//!
//! ```rust
//! use pprovider::{ModelCatalog, ProviderId, provider_for_identifier};
//!
//! let catalog = ModelCatalog::default();
//! let spec = catalog.find("Claude 3.5 Sonnet").expect("default entry");
//! assert_eq!(spec.api_identifier, "claude-3-5-sonnet-20241022");
//! assert_eq!(
//!     provider_for_identifier(&spec.api_identifier).ok(),
//!     Some(ProviderId::Anthropic)
//! );
//! ```

use crate::{ProviderError, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    pub label: String,
    pub api_identifier: String,
    pub description: String,
}

impl ModelSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        api_identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            api_identifier: api_identifier.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![ModelSpec::new(
                "Claude 3.5 Sonnet",
                "Claude 3.5 Sonnet",
                "claude-3-5-sonnet-20241022",
                "Best for daily tasks.",
            )],
        }
    }
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self { models: Vec::new() }
    }

    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    /// Adds an entry, replacing any entry with the same id.
    pub fn with_model(mut self, spec: ModelSpec) -> Self {
        self.models.retain(|existing| existing.id != spec.id);
        self.models.push(spec);
        self
    }

    pub fn find(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|spec| spec.id == id)
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Maps a vendor api identifier to its provider family by prefix.
pub fn provider_for_identifier(api_identifier: &str) -> Result<ProviderId, ProviderError> {
    if api_identifier.starts_with("claude") {
        Ok(ProviderId::Anthropic)
    } else if api_identifier.starts_with("gpt") {
        Ok(ProviderId::OpenAi)
    } else if api_identifier.starts_with("gemini") {
        Ok(ProviderId::Google)
    } else {
        Err(ProviderError::unsupported_model(api_identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn prefixes_route_to_provider_families() {
        assert_eq!(
            provider_for_identifier("claude-3-5-sonnet-20241022").ok(),
            Some(ProviderId::Anthropic)
        );
        assert_eq!(provider_for_identifier("gpt-4o").ok(), Some(ProviderId::OpenAi));
        assert_eq!(
            provider_for_identifier("gemini-1.5-pro").ok(),
            Some(ProviderId::Google)
        );

        let err = provider_for_identifier("llama-3").expect_err("unknown prefix");
        assert_eq!(err.kind, ProviderErrorKind::UnsupportedModel);
        assert_eq!(err.message, "Unsupported model: llama-3");
    }

    #[test]
    fn with_model_replaces_same_id() {
        let catalog = ModelCatalog::default().with_model(ModelSpec::new(
            "Claude 3.5 Sonnet",
            "Claude",
            "claude-3-5-sonnet-latest",
            "",
        ));

        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog
                .find("Claude 3.5 Sonnet")
                .map(|spec| spec.api_identifier.as_str()),
            Some("claude-3-5-sonnet-latest")
        );
        assert!(catalog.find("missing").is_none());
    }
}
