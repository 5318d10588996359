//! Client wrapper for the authentication gateway.
//!
//! Logs in against the authentication server once, keeps the returned
//! token, and sends it as a bearer token on every later request.

use std::sync::RwLock;
use std::time::Duration;

use auth::{AuthConfig, Credential};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors that can occur while talking to the server or a microservice
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, timeout or other transport failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Login rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Not logged in")]
    NotLoggedIn,

    /// The microservice refused the token (missing, expired or invalid)
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// True when the failure happened below HTTP (no response received).
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Auth server base URL (e.g., "https://auth.scalehaus.io")
    pub server: String,

    /// Login path on the auth server (default: "/login")
    pub login_path: String,

    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// Reads `AUTH_SERVER_URL` (required) and `AUTH_CLIENT_TIMEOUT_SECS`.
    /// No signing key is needed on the client side.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = lookup("AUTH_SERVER_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ClientError::Config("missing required variable AUTH_SERVER_URL".to_string()))?;
        let mut config = Self::new(server);

        if let Some(timeout) = lookup("AUTH_CLIENT_TIMEOUT_SECS") {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "invalid value for AUTH_CLIENT_TIMEOUT_SECS: expected whole seconds, got {:?}",
                    timeout
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            login_path: "/login".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TryFrom<&AuthConfig> for ClientConfig {
    type Error = ClientError;

    fn try_from(config: &AuthConfig) -> Result<Self, Self::Error> {
        config
            .server
            .as_deref()
            .map(Self::new)
            .ok_or_else(|| ClientError::Config("auth configuration has no server URL".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    auth_token: String,
}

/// Authenticated HTTP client
pub struct AuthClient {
    client: Client,
    login_url: Url,
    token: RwLock<Option<String>>,
}

impl AuthClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            login_url: login_url(&config)?,
            token: RwLock::new(None),
        })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Exchange credentials for a token and keep it for later requests
    pub async fn login(&self, credential: &Credential) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .json(credential)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("Login refused for {}", credential.email);
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: LoginBody = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        self.set_token(body.auth_token);
        tracing::debug!("Logged in as {}", credential.email);
        Ok(())
    }

    /// GET a JSON resource with the stored token
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let token = self.token().ok_or(ClientError::NotLoggedIn)?;
        let url = Url::parse(url)?;

        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Currently stored token
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Use a token obtained elsewhere
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    /// Forget the stored token
    pub fn logout(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

fn login_url(config: &ClientConfig) -> Result<Url, ClientError> {
    let mut base = Url::parse(&config.server)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(config.login_path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::SigningKey;
    use std::collections::HashMap;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();

        assert!(config.server.is_empty());
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_login_url() {
        let url = |server: &str| login_url(&ClientConfig::new(server)).unwrap().to_string();

        assert_eq!(url("https://auth.scalehaus.io"), "https://auth.scalehaus.io/login");
        assert_eq!(url("https://auth.scalehaus.io/"), "https://auth.scalehaus.io/login");
        assert_eq!(url("https://scalehaus.io/auth"), "https://scalehaus.io/auth/login");
        assert!(login_url(&ClientConfig::new("not a url")).is_err());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("AUTH_SERVER_URL", "https://auth.scalehaus.io"),
            ("AUTH_CLIENT_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));

        let client = AuthClient::new(config).unwrap();
        assert_eq!(client.login_url().as_str(), "https://auth.scalehaus.io/login");

        let defaults = ClientConfig::from_lookup(lookup(&[("AUTH_SERVER_URL", "https://auth.scalehaus.io")])).unwrap();
        assert_eq!(defaults.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_config_from_lookup_errors() {
        assert!(matches!(ClientConfig::from_lookup(lookup(&[])), Err(ClientError::Config(_))));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[("AUTH_SERVER_URL", "")])),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[
                ("AUTH_SERVER_URL", "https://auth.scalehaus.io"),
                ("AUTH_CLIENT_TIMEOUT_SECS", "soon"),
            ])),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_config_from_auth_config() {
        let auth = AuthConfig::new(SigningKey::new("client-test-signing-key").unwrap())
            .with_server("https://scalehaus.io/auth");
        let client = AuthClient::new(ClientConfig::try_from(&auth).unwrap()).unwrap();
        assert_eq!(client.login_url().as_str(), "https://scalehaus.io/auth/login");

        let without_server = AuthConfig::new(SigningKey::new("client-test-signing-key").unwrap());
        assert!(matches!(ClientConfig::try_from(&without_server), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_token_storage() {
        let client = AuthClient::new(ClientConfig::new("https://auth.scalehaus.io")).unwrap();
        assert!(client.token().is_none());

        client.set_token("abc.def");
        assert_eq!(client.token().as_deref(), Some("abc.def"));

        client.logout();
        assert!(client.token().is_none());
    }

    #[tokio::test]
    async fn test_get_requires_login() {
        let client = AuthClient::new(ClientConfig::new("https://auth.scalehaus.io")).unwrap();
        let result: Result<serde_json::Value, _> = client.get("https://reporting.scalehaus.io/report").await;
        assert!(matches!(result, Err(ClientError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client =
            AuthClient::new(ClientConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_secs(5))).unwrap();

        let err = client
            .login(&Credential::new("chet@scalehaus.io", "notswordfish"))
            .await
            .unwrap_err();
        assert!(err.is_transport(), "got {:?}", err);
    }

    #[test]
    fn test_client_error_display() {
        assert_eq!(ClientError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(ClientError::NotLoggedIn.to_string(), "Not logged in");
        let err = ClientError::Status {
            status: 403,
            body: "Nope.".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with status 403: Nope.");
    }
}
