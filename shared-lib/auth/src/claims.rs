//! Token payload and identity definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive value of an application-specific claim.
///
/// Floats are deliberately absent so the signed bytes never depend on
/// number formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClaimValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimValue::Bool(b) => write!(f, "{}", b),
            ClaimValue::Integer(n) => write!(f, "{}", n),
            ClaimValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Extension claims keyed by name, always in sorted order.
pub type ExtensionClaims = BTreeMap<String, ClaimValue>;

/// Claim set carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Subject (authenticated identity, e.g. an email)
    pub subject: String,
    /// Issued at (Unix timestamp)
    pub issued_at: i64,
    /// Expiration time (Unix timestamp)
    pub expires_at: i64,
    /// Application-specific claims
    pub claims: ExtensionClaims,
}

impl Payload {
    /// Create a payload without extension claims.
    pub fn new(subject: impl Into<String>, issued_at: i64, expires_at: i64) -> Self {
        Self {
            subject: subject.into(),
            issued_at,
            expires_at,
            claims: ExtensionClaims::new(),
        }
    }

    /// Add an extension claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Check whether the payload has expired at `now`, tolerating `leeway_secs` of clock skew.
    pub fn is_expired_at(&self, now: i64, leeway_secs: i64) -> bool {
        now > self.expires_at.saturating_add(leeway_secs)
    }
}

/// Identity resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub claims: ExtensionClaims,
}

impl Identity {
    /// Look up an extension claim.
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name)
    }
}

impl From<Payload> for Identity {
    fn from(payload: Payload) -> Self {
        Self {
            subject: payload.subject,
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
            claims: payload.claims,
        }
    }
}

/// Outcome of verifying a request.
pub type AuthResult = Result<Identity, error::AuthError>;
