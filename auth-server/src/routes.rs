//! HTTP routes of the authentication server.

use std::sync::Arc;

use auth::{Credential, Issuer};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use error::{AppError, ErrorResponse};
use serde::{Deserialize, Serialize};

/// Shared state of the login routes
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<Issuer>,
    pub version: String,
}

/// Successful login body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub auth_token: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
}

/// Error wrapper rendering [`AppError`] as a JSON response
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Build the authentication server router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/health", get(health))
        .with_state(state)
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credential>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(credential) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    if credential.email.trim().is_empty() || credential.password.is_empty() {
        return Err(AppError::Validation("email and password are required".to_string()).into());
    }

    let token = state.issuer.issue(&credential).await?;

    Ok(Json(LoginResponse {
        auth_token: token.into_string(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
    })
}
