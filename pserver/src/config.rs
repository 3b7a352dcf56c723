//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with no configuration.
//! Invalid values log a warning and keep the default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use palaver::{
    ChatPolicy, DEFAULT_TOOL_TIMEOUT, ObjectStoreConfig, ProviderBuildConfig, ProviderId,
    RuntimeConfig, StoreConfig,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `HTTP_ADDR`. Default: `0.0.0.0:3000`.
    pub http_addr: SocketAddr,
    /// Env: `DATABASE_URL`. Default: `sqlite://./palaver.db`.
    pub store: StoreConfig,
    /// Env: `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY`.
    pub provider_keys: Vec<(ProviderId, String)>,
    /// Env: `TOGETHER_API_KEY`.
    pub together_api_key: Option<String>,
    /// Env: `UPLOAD_DIR`. Default: `./uploads`.
    pub upload_dir: PathBuf,
    /// Env: `PUBLIC_BASE_URL`. Default: `http://localhost:3000/files`.
    pub public_base_url: String,
    /// Env: `TOOL_TIMEOUT_SECS`. Default: 30.
    pub tool_timeout: Duration,
    /// Env: `MAX_TOOL_STEPS`. Default: 5.
    pub max_tool_steps: usize,
    /// Env: `PALAVER_USERS`, `token:id:name:email` entries separated by `;`.
    pub users: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 3000).into(),
            store: StoreConfig::Sqlite {
                path: PathBuf::from("./palaver.db"),
            },
            provider_keys: Vec::new(),
            together_api_key: None,
            upload_dir: PathBuf::from("./uploads"),
            public_base_url: "http://localhost:3000/files".to_string(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            max_tool_steps: ChatPolicy::default().max_steps,
            users: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(url) = lookup("DATABASE_URL") {
            match StoreConfig::from_database_url(&url) {
                Ok(store) => config.store = store,
                Err(error) => {
                    tracing::warn!(error = %error, "invalid DATABASE_URL, using default")
                }
            }
        }

        for (provider, key) in [
            (ProviderId::OpenAi, "OPENAI_API_KEY"),
            (ProviderId::Anthropic, "ANTHROPIC_API_KEY"),
            (ProviderId::Google, "GOOGLE_API_KEY"),
        ] {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                config.provider_keys.push((provider, value));
            }
        }

        config.together_api_key = lookup("TOGETHER_API_KEY").filter(|key| !key.trim().is_empty());

        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            config.public_base_url = url;
        }

        if let Some(value) = lookup("TOOL_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) if secs > 0 => config.tool_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %value, "invalid TOOL_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(value) = lookup("MAX_TOOL_STEPS") {
            match value.parse::<usize>() {
                Ok(steps) if steps > 0 => config.max_tool_steps = steps,
                _ => tracing::warn!(value = %value, "invalid MAX_TOOL_STEPS, using default"),
            }
        }

        if let Some(users) = lookup("PALAVER_USERS") {
            config.users = users;
        }

        config
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            providers: self
                .provider_keys
                .iter()
                .map(|(provider, key)| ProviderBuildConfig::new(*provider, key.clone()))
                .collect(),
            store: self.store.clone(),
            objects: ObjectStoreConfig::Filesystem {
                root: self.upload_dir.clone(),
                public_base_url: self.public_base_url.clone(),
            },
            together_api_key: self.together_api_key.clone(),
            policy: ChatPolicy::default().with_max_steps(self.max_tool_steps),
            tool_timeout: self.tool_timeout,
            ..RuntimeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3000).into());
        assert_eq!(config.max_tool_steps, 5);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert!(config.provider_keys.is_empty());
        assert_eq!(config.store.backend_name(), "sqlite");
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "memory"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OPENAI_API_KEY", "  "),
            ("TOOL_TIMEOUT_SECS", "5"),
            ("MAX_TOOL_STEPS", "3"),
            ("UPLOAD_DIR", "/srv/uploads"),
        ]));

        assert_eq!(config.http_addr, ([127, 0, 0, 1], 8080).into());
        assert_eq!(config.store, StoreConfig::InMemory);
        assert_eq!(
            config.provider_keys,
            vec![(ProviderId::Anthropic, "sk-ant".to_string())]
        );
        assert_eq!(config.tool_timeout, Duration::from_secs(5));

        let runtime = config.runtime_config();
        assert_eq!(runtime.policy.max_steps, 3);
        assert_eq!(runtime.providers.len(), 1);
        assert!(matches!(
            runtime.objects,
            ObjectStoreConfig::Filesystem { ref root, .. } if root == &PathBuf::from("/srv/uploads")
        ));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not an address"),
            ("DATABASE_URL", "mysql://nope"),
            ("TOOL_TIMEOUT_SECS", "soon"),
            ("MAX_TOOL_STEPS", "0"),
        ]));

        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.store.backend_name(), "sqlite");
        assert_eq!(config.tool_timeout, DEFAULT_TOOL_TIMEOUT);
        assert_eq!(config.max_tool_steps, 5);
    }
}
