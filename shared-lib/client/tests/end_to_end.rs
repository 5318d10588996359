//! End-to-end flow over real sockets: log in at the auth server, then read a
//! report from a microservice that only shares the signing key.

use std::sync::Arc;

use auth::{AuthConfig, Credential, Issuer, SigningKey, Verifier};
use auth_server_lib::{AppState, InMemoryIdentityStore};
use client::{AuthClient, ClientConfig, ClientError};
use report_service::{DomainPolicy, Report, ReportState};

struct Services {
    config: AuthConfig,
    auth_url: String,
    report_url: String,
}

async fn spawn(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start() -> Services {
    let config = AuthConfig::new(SigningKey::new("end-to-end-signing-key-0123456789").unwrap());

    let store = InMemoryIdentityStore::with_users(&[
        Credential::new("chet@scalehaus.io", "notswordfish"),
        Credential::new("guest@example.com", "guest"),
    ]);
    let auth_app = auth_server_lib::router(AppState {
        issuer: Arc::new(Issuer::new(&config, Arc::new(store))),
        version: "e2e".to_string(),
    });

    let report_app = report_service::router(ReportState {
        verifier: Arc::new(Verifier::new(&config)),
        policy: Arc::new(DomainPolicy::new("scalehaus.io")),
    });

    let auth_url = spawn(auth_app).await;
    Services {
        config: config.with_server(auth_url.clone()),
        auth_url,
        report_url: format!("{}/report", spawn(report_app).await),
    }
}

#[tokio::test]
async fn test_login_then_fetch_report() {
    let services = start().await;
    let client = AuthClient::new(ClientConfig::try_from(&services.config).unwrap()).unwrap();

    client
        .login(&Credential::new("chet@scalehaus.io", "notswordfish"))
        .await
        .unwrap();
    assert!(client.token().is_some());

    let report: Report = client.get(&services.report_url).await.unwrap();
    assert_eq!(report.generated_for, "chet@scalehaus.io");
}

#[tokio::test]
async fn test_wrong_password() {
    let services = start().await;
    let client = AuthClient::new(ClientConfig::new(&services.auth_url)).unwrap();

    let err = client
        .login(&Credential::new("chet@scalehaus.io", "swordfish"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCredentials));
    assert!(client.token().is_none());
}

#[tokio::test]
async fn test_authenticated_but_forbidden() {
    let services = start().await;
    let client = AuthClient::new(ClientConfig::new(&services.auth_url)).unwrap();

    client.login(&Credential::new("guest@example.com", "guest")).await.unwrap();
    let err = client.get::<Report>(&services.report_url).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 403, .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_foreign_token_is_unauthenticated() {
    let services = start().await;
    let client = AuthClient::new(ClientConfig::new(&services.auth_url)).unwrap();

    let other = AuthConfig::new(SigningKey::new("some-other-deployment-key-9876543").unwrap());
    let forged = Issuer::new(&other, Arc::new(InMemoryIdentityStore::new()))
        .issue_for(auth::VerifiedIdentity::new("chet@scalehaus.io"))
        .unwrap();
    client.set_token(forged.into_string());

    let err = client.get::<Report>(&services.report_url).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated), "got {:?}", err);
}
