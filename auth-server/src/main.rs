//! Authentication server entry point
//!
//! Accepts `{email, password}` at `POST /login` and answers with a signed
//! token that protected microservices verify locally.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::Issuer;
use auth_server_lib::{router, AppState, InMemoryIdentityStore, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_server=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting auth-server v{}", config.version);
    tracing::info!(
        "Token TTL {}s, signing with {} key {}",
        config.auth.token_ttl_secs(),
        config.auth.algorithm,
        config.auth.keys.current().fingerprint()
    );

    let store = InMemoryIdentityStore::with_users(&config.users);
    if store.is_empty() {
        tracing::warn!("No accounts configured (AUTH_USERS); every login will be rejected");
    }

    let issuer = Arc::new(Issuer::new(&config.auth, Arc::new(store)));
    let app = router(AppState {
        issuer,
        version: config.version.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
