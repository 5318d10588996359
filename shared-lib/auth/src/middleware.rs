//! axum integration for [`Verifier`].
//!
//! ```ignore
//! let verifier = Arc::new(Verifier::new(&config));
//! let app = Router::new()
//!     .route("/report", get(report))
//!     .layer(axum::middleware::from_fn_with_state(verifier, require_auth));
//!
//! async fn report(ctx: RequestContext) -> String {
//!     ctx.identity.subject
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error::{AuthError, ErrorResponse};
use uuid::Uuid;

use crate::claims::{AuthResult, Identity};
use crate::verifier::Verifier;

/// Per-request authentication context.
///
/// Present in the request extensions only after successful verification.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlates log lines of one request
    pub request_id: Uuid,
    /// Identity resolved from the bearer token
    pub identity: Identity,
}

/// Verification outcome stored by [`attach_auth`], success or failure.
#[derive(Debug, Clone)]
pub struct AuthOutcome(pub AuthResult);

/// Error response for authentication and authorization failures.
///
/// Token failures all render the same body; the precise reason is only
/// logged.
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(ErrorResponse::from(&self.0))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn authenticate(verifier: &Verifier, request: &Request) -> (Uuid, AuthResult) {
    let request_id = Uuid::new_v4();
    let span = tracing::debug_span!("authenticate", %request_id, path = %request.uri().path());
    let outcome = span.in_scope(|| verifier.authenticate(request.headers()));
    (request_id, outcome)
}

/// Reject unauthenticated requests with 401; otherwise attach a [`RequestContext`].
pub async fn require_auth(
    State(verifier): State<Arc<Verifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&verifier, &request) {
        (request_id, Ok(identity)) => {
            request
                .extensions_mut()
                .insert(RequestContext { request_id, identity });
            next.run(request).await
        }
        (request_id, Err(err)) => {
            tracing::info!("Request {} unauthenticated: {}", request_id, err.reason());
            AuthRejection(err).into_response()
        }
    }
}

/// Always continue, leaving the decision to the handler via [`AuthOutcome`].
pub async fn attach_auth(
    State(verifier): State<Arc<Verifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let (request_id, outcome) = authenticate(&verifier, &request);
    if let Ok(identity) = &outcome {
        request.extensions_mut().insert(RequestContext {
            request_id,
            identity: identity.clone(),
        });
    }
    request.extensions_mut().insert(AuthOutcome(outcome));
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AuthRejection(AuthError::NoToken))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        RequestContext::from_request_parts(parts, state)
            .await
            .map(|ctx| ctx.identity)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthOutcome
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthOutcome>()
            .cloned()
            .unwrap_or(AuthOutcome(Err(AuthError::NoToken))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::clock::ManualClock;
    use crate::config::AuthConfig;
    use crate::issuer::VerifiedIdentity;
    use crate::signer::SigningKey;
    use crate::Issuer;

    const NOW: i64 = 1_700_000_000;

    struct NoStore;

    #[async_trait]
    impl crate::IdentityStore for NoStore {
        async fn verify(&self, _: &crate::Credential) -> Result<VerifiedIdentity, AuthError> {
            Err(AuthError::InvalidCredentials)
        }
    }

    fn setup() -> (Issuer, Arc<Verifier>) {
        let config = AuthConfig::new(SigningKey::new("middleware-test-key").unwrap());
        let clock = Arc::new(ManualClock::new(NOW));
        let issuer = Issuer::new(&config, Arc::new(NoStore)).with_clock(clock.clone());
        let verifier = Arc::new(Verifier::new(&config).with_clock(clock));
        (issuer, verifier)
    }

    async fn whoami(ctx: RequestContext) -> String {
        ctx.identity.subject
    }

    async fn outcome(AuthOutcome(outcome): AuthOutcome) -> String {
        match outcome {
            Ok(identity) => format!("ok:{}", identity.subject),
            Err(e) => format!("err:{}", e.reason()),
        }
    }

    fn request(auth: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_require_auth_accepts_valid_token() {
        let (issuer, verifier) = setup();
        let app = Router::new()
            .route("/", get(whoami))
            .layer(axum::middleware::from_fn_with_state(verifier, require_auth));

        let token = issuer.issue_for(VerifiedIdentity::new("chet@scalehaus.io")).unwrap();
        let response = app
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "chet@scalehaus.io");
    }

    #[tokio::test]
    async fn test_require_auth_rejects_uniformly() {
        let (issuer, verifier) = setup();
        let app = Router::new()
            .route("/", get(whoami))
            .layer(axum::middleware::from_fn_with_state(verifier, require_auth));

        let token = issuer.issue_for(VerifiedIdentity::new("chet@scalehaus.io")).unwrap();
        let forged = format!("{}.{}", token.payload_segment(), "A".repeat(43));

        let mut bodies = Vec::new();
        for auth in [None, Some("Bearer not-a-token".to_string()), Some(format!("Bearer {}", forged))] {
            let response = app.clone().oneshot(request(auth.as_deref())).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
            bodies.push(body_string(response).await);
        }

        assert!(bodies.iter().all(|b| b == &bodies[0]));
        let body: ErrorResponse = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(body.code, "AUTH_UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_attach_auth_hands_outcome_to_handler() {
        let (issuer, verifier) = setup();
        let app = Router::new()
            .route("/", get(outcome))
            .layer(axum::middleware::from_fn_with_state(verifier, attach_auth));

        let token = issuer.issue_for(VerifiedIdentity::new("chet@scalehaus.io")).unwrap();
        let ok = app
            .clone()
            .oneshot(request(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(body_string(ok).await, "ok:chet@scalehaus.io");

        let missing = app.oneshot(request(None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::OK);
        assert_eq!(body_string(missing).await, "err:no_token");
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_unauthenticated() {
        let app = Router::new().route("/", get(whoami));
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_rejection_has_no_challenge() {
        let response = AuthRejection(AuthError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
