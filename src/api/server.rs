use std::sync::Arc;

use axum::{Router, routing::any};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{
    services::{decrypt_image, not_found},
    state::AppState,
};
use crate::config::Config;
use crate::crypto::KeyManager;
use crate::origin::{HttpConfig, HttpOrigin};
use crate::pipeline::Pipeline;
use crate::response::CachePolicy;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single image endpoint at `/`; everything else is 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(decrypt_image))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn build_state(config: &Config) -> Result<AppState, AnyError> {
    let keys = Arc::new(KeyManager::new(config.crypto.key.clone()));
    if !keys.is_configured() {
        warn!("No AES key configured (set DECRYPTBOX_AES_KEY); image requests will fail");
    }

    let origin = HttpOrigin::new(HttpConfig::from(&config.origin))?;

    let pipeline = Pipeline::builder()
        .keys(keys)
        .origin(Arc::new(origin))
        .cache(CachePolicy::public(config.cache.max_age_secs))
        .validate_signatures(config.crypto.validate_signatures)
        .build();

    Ok(AppState::new(pipeline))
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let state = build_state(&config)?;
    let app = router(state);

    let address = config.server.bind_addr;
    let listener = TcpListener::bind(address).await?;
    info!(%address, "DecryptBox listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
