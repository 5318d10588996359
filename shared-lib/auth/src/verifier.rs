//! Local token verification.
//!
//! Verification never leaves the process: the token is split, its
//! signature checked against the configured key set, its payload parsed and
//! its expiry compared with the clock. The signature check always runs, and
//! a bad signature outranks every later finding, so a forged token is never
//! reported as merely expired.

use std::sync::Arc;

use error::AuthError;
use http::header::AUTHORIZATION;
use http::HeaderMap;

use crate::claims::{AuthResult, Identity};
use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::config::AuthConfig;
use crate::signer::{KeySet, SignatureAlgorithm};

const BEARER: &str = "bearer";

/// Extract the bearer token from an `Authorization` header.
///
/// The scheme is matched case-insensitively. Returns `None` for a missing
/// header, a non-ASCII value, another scheme or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Microservice-side token verifier.
///
/// Immutable after construction; share it behind an `Arc` across workers.
pub struct Verifier {
    keys: KeySet,
    algorithm: SignatureAlgorithm,
    leeway_secs: i64,
    clock: Arc<dyn Clock>,
}

impl Verifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keys: config.keys.clone(),
            algorithm: config.algorithm,
            leeway_secs: config.leeway_secs(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify the bearer token carried by a request's headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthResult {
        match bearer_token(headers) {
            Some(token) => self.verify(token),
            None => {
                tracing::debug!("Rejected request: no usable bearer token");
                Err(AuthError::NoToken)
            }
        }
    }

    /// Verify a token string and resolve the identity it carries.
    pub fn verify(&self, token: &str) -> AuthResult {
        let result = self.check(token);
        match &result {
            Ok(identity) => tracing::debug!("Verified token for {}", identity.subject),
            Err(AuthError::InvalidSignature) => {
                tracing::warn!("Rejected token with invalid signature (possible forgery)")
            }
            Err(e) => tracing::debug!("Rejected token: {}", e),
        }
        result
    }

    fn check(&self, token: &str) -> AuthResult {
        let raw = codec::split(token)?;

        let matched = self
            .algorithm
            .matching_key(&raw.payload_bytes, &raw.signature, self.keys.candidates());
        let decoded = codec::decode_payload(&raw.payload_bytes);
        let now = self.clock.now();

        let key = matched.ok_or(AuthError::InvalidSignature)?;
        let payload = decoded?;

        if payload.is_expired_at(now, self.leeway_secs) {
            tracing::debug!(
                "Token for {} expired at {} (now {})",
                payload.subject,
                payload.expires_at,
                now
            );
            return Err(AuthError::TokenExpired);
        }

        if !std::ptr::eq(key, self.keys.current()) {
            tracing::debug!(
                "Token for {} verified with previous key {}",
                payload.subject,
                key.fingerprint()
            );
        }

        Ok(Identity::from(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer   abc.def ")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("abc.def")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut non_ascii = HeaderMap::new();
        non_ascii.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap());
        assert_eq!(bearer_token(&non_ascii), None);
    }
}
