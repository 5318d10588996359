//! Report routes

use std::sync::Arc;

use auth::{require_auth, AuthRejection, RequestContext, Verifier};
use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::DomainPolicy;

/// Shared state of the report routes
#[derive(Clone)]
pub struct ReportState {
    pub verifier: Arc<Verifier>,
    pub policy: Arc<DomainPolicy>,
}

/// Report body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub generated_for: String,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub region: String,
    pub requests: u64,
}

/// Build the report router; everything except `/health` requires a token
pub fn router(state: ReportState) -> Router {
    let protected = Router::new()
        .route("/report", get(report))
        .route_layer(middleware::from_fn_with_state(state.verifier.clone(), require_auth));

    Router::new()
        .merge(protected)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn report(
    State(state): State<ReportState>,
    ctx: RequestContext,
) -> Result<Json<Report>, AuthRejection> {
    state.policy.authorize(&ctx.identity)?;

    tracing::info!("Request {} serving report for {}", ctx.request_id, ctx.identity.subject);

    Ok(Json(Report {
        title: "Weekly traffic".to_string(),
        generated_for: ctx.identity.subject,
        generated_at: Utc::now(),
        rows: vec![
            ReportRow {
                region: "us-east".to_string(),
                requests: 1_204,
            },
            ReportRow {
                region: "eu-west".to_string(),
                requests: 877,
            },
        ],
    }))
}
