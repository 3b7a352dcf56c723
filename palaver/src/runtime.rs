//! Runtime wiring: gateway, stores, built-in tools, observability, and the
//! chat service in one bundle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pchat::tools::{
    BuiltinToolDeps, ForecastSource, ImageSynthesizer, OpenMeteoForecast,
    TogetherImageSynthesizer, builtin_tools,
};
use pobserve::{ObservabilityHooks, SafeProviderHooks, SafeToolHooks, SafeTurnHooks};
use pstore::{FilesystemObjectStorage, StoreConfig, create_chat_store};
use reqwest::Client;

use crate::{
    ChatError, ChatPolicy, ChatService, ChatStore, DEFAULT_TOOL_TIMEOUT, DefaultToolRuntime,
    InMemoryObjectStorage, ModelGateway, ModelTitleGenerator, ObjectStorage, ProviderBuildConfig,
    SecretString, ToolKind, ToolRegistry, build_gateway,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreConfig {
    Filesystem {
        root: PathBuf,
        public_base_url: String,
    },
    InMemory {
        base_url: String,
    },
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self::InMemory {
            base_url: "memory://objects".to_string(),
        }
    }
}

pub fn create_object_storage(
    config: &ObjectStoreConfig,
) -> Result<Arc<dyn ObjectStorage>, ChatError> {
    match config {
        ObjectStoreConfig::Filesystem {
            root,
            public_base_url,
        } => Ok(Arc::new(FilesystemObjectStorage::new(
            root,
            public_base_url.clone(),
        )?)),
        ObjectStoreConfig::InMemory { base_url } => {
            Ok(Arc::new(InMemoryObjectStorage::new(base_url.clone())))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub providers: Vec<ProviderBuildConfig>,
    pub store: StoreConfig,
    pub objects: ObjectStoreConfig,
    /// Enables `generateImage` when present.
    pub together_api_key: Option<String>,
    pub policy: ChatPolicy,
    pub tool_timeout: Duration,
    /// Timeout for the weather and image HTTP clients.
    pub http_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            store: StoreConfig::InMemory,
            objects: ObjectStoreConfig::default(),
            together_api_key: None,
            policy: ChatPolicy::default(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Already-built collaborators for [`build_runtime_with`].
#[derive(Clone)]
pub struct RuntimeParts {
    pub gateway: Arc<ModelGateway>,
    pub store: Arc<dyn ChatStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub forecast: Arc<dyn ForecastSource>,
    pub images: Option<Arc<dyn ImageSynthesizer>>,
}

#[derive(Clone)]
pub struct RuntimeBundle {
    pub gateway: Arc<ModelGateway>,
    pub store: Arc<dyn ChatStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub tools: Arc<ToolRegistry>,
    pub chat: ChatService,
}

pub fn build_runtime(config: RuntimeConfig) -> Result<RuntimeBundle, ChatError> {
    let gateway = Arc::new(build_gateway(config.providers.clone())?);
    tracing::info!(backend = config.store.backend_name(), "opening chat store");
    let store = create_chat_store(config.store.clone())?;
    let objects = create_object_storage(&config.objects)?;

    let http = Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|err| ChatError::tooling(format!("failed to build tool http client: {err}")))?;
    let forecast: Arc<dyn ForecastSource> = Arc::new(OpenMeteoForecast::new(http.clone()));
    let images = config
        .together_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| {
            Arc::new(TogetherImageSynthesizer::new(http, SecretString::new(key)))
                as Arc<dyn ImageSynthesizer>
        });

    build_runtime_with(
        RuntimeParts {
            gateway,
            store,
            objects,
            forecast,
            images,
        },
        config.policy,
        config.tool_timeout,
    )
}

pub fn build_runtime_with(
    parts: RuntimeParts,
    mut policy: ChatPolicy,
    tool_timeout: Duration,
) -> Result<RuntimeBundle, ChatError> {
    if parts.images.is_none() {
        policy
            .enabled_tools
            .retain(|kind| *kind != ToolKind::GenerateImage);
        tracing::info!("image generation disabled: no image service configured");
    }

    let tools = Arc::new(builtin_tools(BuiltinToolDeps {
        forecast: parts.forecast,
        images: parts.images,
        objects: Arc::clone(&parts.objects),
        store: Arc::clone(&parts.store),
    }));

    let hooks = ObservabilityHooks::new();
    let tool_runtime = DefaultToolRuntime::new(Arc::clone(&tools))
        .with_timeout(tool_timeout)
        .with_hooks(Arc::new(SafeToolHooks::new(hooks)));
    let titles =
        ModelTitleGenerator::default().with_hooks(Arc::new(SafeProviderHooks::new(hooks)));

    let chat = ChatService::builder(Arc::clone(&parts.gateway), Arc::clone(&parts.store))
        .tool_runtime(Arc::new(tool_runtime))
        .title_generator(Arc::new(titles))
        .policy(policy)
        .hooks(Arc::new(SafeTurnHooks::new(hooks)))
        .build()?;

    Ok(RuntimeBundle {
        gateway: parts.gateway,
        store: parts.store,
        objects: parts.objects,
        tools,
        chat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelCatalog, ProviderRegistry};

    #[test]
    fn default_config_builds_in_memory_runtime_without_images() {
        let runtime = build_runtime(RuntimeConfig::default()).expect("runtime");

        assert!(runtime.tools.contains(ToolKind::Weather));
        assert!(runtime.tools.contains(ToolKind::UpdateMemory));
        assert!(!runtime.tools.contains(ToolKind::GenerateImage));
        assert_eq!(
            runtime.chat.policy().enabled_tools,
            vec![ToolKind::Weather, ToolKind::UpdateMemory]
        );
    }

    #[test]
    fn image_key_enables_generate_image() {
        let runtime = build_runtime(RuntimeConfig {
            together_api_key: Some("together-key".to_string()),
            ..RuntimeConfig::default()
        })
        .expect("runtime");

        assert!(runtime.tools.contains(ToolKind::GenerateImage));
        assert!(
            runtime
                .chat
                .policy()
                .enabled_tools
                .contains(&ToolKind::GenerateImage)
        );
    }

    #[test]
    fn blank_image_key_counts_as_missing() {
        let runtime = build_runtime(RuntimeConfig {
            together_api_key: Some("  ".to_string()),
            ..RuntimeConfig::default()
        })
        .expect("runtime");
        assert!(!runtime.tools.contains(ToolKind::GenerateImage));
    }

    #[test]
    fn invalid_policy_is_reported() {
        let parts = RuntimeParts {
            gateway: Arc::new(ModelGateway::new(
                ModelCatalog::default(),
                ProviderRegistry::new(),
            )),
            store: Arc::new(crate::InMemoryChatStore::new()),
            objects: Arc::new(InMemoryObjectStorage::default()),
            forecast: Arc::new(OpenMeteoForecast::new(Client::new())),
            images: None,
        };
        let result = build_runtime_with(
            parts,
            ChatPolicy::default().with_max_steps(0),
            DEFAULT_TOOL_TIMEOUT,
        );
        assert!(result.is_err());
    }
}
