//! Issuer and verifier configuration.

use std::time::Duration;

use thiserror::Error;

use crate::signer::{KeySet, SignatureAlgorithm, SignerError, SigningKey};

/// Default token lifetime: 15 minutes.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Keys shorter than this are accepted but logged as weak.
pub const RECOMMENDED_KEY_LEN: usize = 32;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Authentication configuration shared by the issuer and every verifier.
///
/// Built once at startup and passed by reference to constructors.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Current and previous signing keys
    pub keys: KeySet,
    /// MAC construction
    pub algorithm: SignatureAlgorithm,
    /// Token validity duration
    pub token_ttl: Duration,
    /// Tolerated clock skew when checking expiry
    pub leeway: Duration,
    /// Authentication server base URL (client wrapper only)
    pub server: Option<String>,
}

impl AuthConfig {
    /// Create a configuration with defaults for everything but the key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            keys: KeySet::new(signing_key),
            algorithm: SignatureAlgorithm::default(),
            token_ttl: DEFAULT_TOKEN_TTL,
            leeway: Duration::ZERO,
            server: None,
        }
    }

    /// Accept tokens signed with an older key.
    pub fn with_previous_key(mut self, key: SigningKey) -> Self {
        self.keys = self.keys.with_previous(key);
        self
    }

    /// Set the token time-to-live.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the tolerated clock skew.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// Recognized variables: `AUTH_SIGNING_KEY` (required),
    /// `AUTH_PREVIOUS_SIGNING_KEYS`, `AUTH_TOKEN_TTL_SECS`,
    /// `AUTH_CLOCK_LEEWAY_SECS`, `AUTH_SIGNING_ALGORITHM`, `AUTH_SERVER_URL`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let current = lookup("AUTH_SIGNING_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("AUTH_SIGNING_KEY"))?;
        let mut config = Self::new(parse_key("AUTH_SIGNING_KEY", &current)?);

        if let Some(previous) = lookup("AUTH_PREVIOUS_SIGNING_KEYS") {
            for value in previous.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                config = config.with_previous_key(parse_key("AUTH_PREVIOUS_SIGNING_KEYS", value)?);
            }
        }

        if let Some(ttl) = lookup("AUTH_TOKEN_TTL_SECS") {
            let secs = parse_secs("AUTH_TOKEN_TTL_SECS", &ttl)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "AUTH_TOKEN_TTL_SECS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.token_ttl = Duration::from_secs(secs);
        }

        if let Some(leeway) = lookup("AUTH_CLOCK_LEEWAY_SECS") {
            config.leeway = Duration::from_secs(parse_secs("AUTH_CLOCK_LEEWAY_SECS", &leeway)?);
        }

        if let Some(alg) = lookup("AUTH_SIGNING_ALGORITHM") {
            config.algorithm = alg.parse::<SignatureAlgorithm>().map_err(|e: SignerError| ConfigError::Invalid {
                name: "AUTH_SIGNING_ALGORITHM",
                reason: e.to_string(),
            })?;
        }

        if let Some(server) = lookup("AUTH_SERVER_URL").filter(|v| !v.is_empty()) {
            config.server = Some(server);
        }

        for key in config.keys.candidates() {
            if key.len() < RECOMMENDED_KEY_LEN {
                tracing::warn!(
                    "Signing key {} is only {} bytes; use at least {}",
                    key.fingerprint(),
                    key.len(),
                    RECOMMENDED_KEY_LEN
                );
            }
        }

        Ok(config)
    }

    /// Token TTL in whole seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// Leeway in whole seconds.
    pub fn leeway_secs(&self) -> i64 {
        i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX)
    }
}

fn parse_key(name: &'static str, value: &str) -> Result<SigningKey, ConfigError> {
    SigningKey::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_secs(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("expected whole seconds, got {:?}", value),
    })
}
