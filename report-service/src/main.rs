//! Report service entry point

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::Verifier;
use report_service::{router, DomainPolicy, ReportConfig, ReportState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_service=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReportConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        "Accepting tokens signed by {} key(s), reports limited to @{}",
        config.auth.keys.candidates().count(),
        config.allowed_domain
    );

    let app = router(ReportState {
        verifier: Arc::new(Verifier::new(&config.auth)),
        policy: Arc::new(DomainPolicy::new(&config.allowed_domain)),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Protected microservice listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
