//! Token issuance.
//!
//! The issuer holds no session state: a token is a pure function of the
//! verified identity, the clock and the current signing key.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use error::AuthError;
use serde::{Deserialize, Serialize};

use crate::claims::{ClaimValue, ExtensionClaims, Payload};
use crate::clock::{Clock, SystemClock};
use crate::codec::{self, Token};
use crate::config::AuthConfig;
use crate::signer::{SignatureAlgorithm, SigningKey};

/// Login credentials as submitted by a client.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity confirmed by an [`IdentityStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub claims: ExtensionClaims,
}

impl VerifiedIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            claims: ExtensionClaims::new(),
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }
}

/// Credential matching backend.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Match a credential against known identities.
    ///
    /// Implementations return [`AuthError::InvalidCredentials`] for both an
    /// unknown identity and a wrong secret.
    async fn verify(&self, credential: &Credential) -> Result<VerifiedIdentity, AuthError>;
}

/// Authentication server role: turns verified credentials into tokens.
pub struct Issuer {
    store: Arc<dyn IdentityStore>,
    algorithm: SignatureAlgorithm,
    key: SigningKey,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl Issuer {
    /// Create an issuer signing with the configuration's current key.
    pub fn new(config: &AuthConfig, store: Arc<dyn IdentityStore>) -> Self {
        Self {
            store,
            algorithm: config.algorithm,
            key: config.keys.current().clone(),
            ttl_secs: config.token_ttl_secs(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Verify a credential with the identity store and issue a token for it.
    pub async fn issue(&self, credential: &Credential) -> Result<Token, AuthError> {
        let identity = self.store.verify(credential).await.map_err(|e| {
            tracing::info!("Login rejected for {}: {}", credential.email, e.reason());
            e
        })?;
        self.issue_for(identity)
    }

    /// Issue a token for an identity that has already been verified.
    pub fn issue_for(&self, identity: VerifiedIdentity) -> Result<Token, AuthError> {
        let now = self.clock.now();
        let expires_at = now.checked_add(self.ttl_secs).ok_or_else(|| {
            AuthError::TokenCreationFailed("expiry overflows timestamp range".to_string())
        })?;

        let payload = Payload {
            subject: identity.subject,
            issued_at: now,
            expires_at,
            claims: identity.claims,
        };

        let bytes = codec::canonical_bytes(&payload).map_err(|e| {
            tracing::error!("Failed to encode payload: {}", e);
            AuthError::TokenCreationFailed(e.to_string())
        })?;
        let signature = self.algorithm.sign(&bytes, &self.key).map_err(|e| {
            tracing::error!("Failed to sign payload: {}", e);
            AuthError::TokenCreationFailed(e.to_string())
        })?;

        let segment = codec::encode_segment(&bytes);
        let token = codec::join(&segment, &signature);

        tracing::info!(
            "Issued token for {} (expires_at={}, key={})",
            payload.subject,
            expires_at,
            self.key.fingerprint()
        );
        Ok(token)
    }
}
