use std::sync::Arc;

use pserver::{AppState, ServerConfig, StaticTokenIdentity};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pserver=debug")),
        )
        .init();

    info!("starting palaver server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        store = config.store.backend_name(),
        providers = config.provider_keys.len(),
        images = config.together_api_key.is_some(),
        "loaded configuration"
    );

    let identity = StaticTokenIdentity::parse(&config.users)?;
    if identity.is_empty() {
        tracing::warn!("PALAVER_USERS is empty, every request is anonymous");
    }

    let runtime = palaver::build_runtime(config.runtime_config())?;
    let state = AppState::new(runtime.chat, runtime.objects, Arc::new(identity))
        .with_static_root(config.upload_dir.clone());

    tokio::select! {
        result = pserver::serve(state, config.http_addr) => {
            if let Err(error) = result {
                tracing::error!(error = %error, "HTTP server failed");
                return Err(error);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
