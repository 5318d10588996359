//! Keyed signatures over canonical payload bytes.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Signer errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signing key must not be empty")]
    EmptyKey,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Shared secret used to sign and verify tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    material: Vec<u8>,
}

impl SigningKey {
    pub fn new(material: impl Into<Vec<u8>>) -> Result<Self, SignerError> {
        let material = material.into();
        if material.is_empty() {
            return Err(SignerError::EmptyKey);
        }
        Ok(Self { material })
    }

    /// Parse a configured key: raw text, or hex when prefixed with `hex:`.
    pub fn parse(value: &str) -> Result<Self, SignerError> {
        match value.strip_prefix("hex:") {
            Some(encoded) => {
                let bytes = hex::decode(encoded.trim()).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
                Self::new(bytes)
            }
            None => Self::new(value.as_bytes()),
        }
    }

    pub fn len(&self) -> usize {
        self.material.len()
    }

    /// Short identifier safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&<Sha256 as sha2::Digest>::digest(&self.material)[..4])
    }

    fn as_bytes(&self) -> &[u8] {
        &self.material
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Current signing key plus previous keys still accepted for verification.
#[derive(Debug, Clone)]
pub struct KeySet {
    current: SigningKey,
    previous: Vec<SigningKey>,
}

impl KeySet {
    pub fn new(current: SigningKey) -> Self {
        Self {
            current,
            previous: Vec::new(),
        }
    }

    /// Accept an older key during rollover.
    pub fn with_previous(mut self, key: SigningKey) -> Self {
        self.previous.push(key);
        self
    }

    pub fn current(&self) -> &SigningKey {
        &self.current
    }

    pub fn previous(&self) -> &[SigningKey] {
        &self.previous
    }

    /// Verification candidates, current key first.
    pub fn candidates(&self) -> impl Iterator<Item = &SigningKey> {
        std::iter::once(&self.current).chain(self.previous.iter())
    }
}

/// MAC construction used for token signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    HmacSha256,
    HmacSha512,
}

impl SignatureAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::HmacSha256 => "HS256",
            SignatureAlgorithm::HmacSha512 => "HS512",
        }
    }

    /// Sign canonical payload bytes with `key`.
    pub fn sign(&self, payload: &[u8], key: &SigningKey) -> Result<Vec<u8>, SignerError> {
        match self {
            SignatureAlgorithm::HmacSha256 => mac_sign::<HmacSha256>(key.as_bytes(), payload),
            SignatureAlgorithm::HmacSha512 => mac_sign::<HmacSha512>(key.as_bytes(), payload),
        }
    }

    /// First candidate key whose signature matches, if any.
    pub fn matching_key<'a, I>(&self, payload: &[u8], signature: &[u8], candidates: I) -> Option<&'a SigningKey>
    where
        I: IntoIterator<Item = &'a SigningKey>,
    {
        candidates.into_iter().find(|key| match self {
            SignatureAlgorithm::HmacSha256 => mac_verify::<HmacSha256>(key.as_bytes(), payload, signature),
            SignatureAlgorithm::HmacSha512 => mac_verify::<HmacSha512>(key.as_bytes(), payload, signature),
        })
    }

    /// Check a signature against candidate keys in order.
    pub fn verify<'a, I>(&self, payload: &[u8], signature: &[u8], candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a SigningKey>,
    {
        self.matching_key(payload, signature, candidates).is_some()
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(SignatureAlgorithm::HmacSha256),
            "HS512" => Ok(SignatureAlgorithm::HmacSha512),
            other => Err(SignerError::UnknownAlgorithm(other.to_string())),
        }
    }
}

fn mac_sign<M: Mac + KeyInit>(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, SignerError> {
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|e| {
        tracing::error!("Failed to create HMAC key: {}", e);
        SignerError::InvalidKey(e.to_string())
    })?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + KeyInit>(key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(key) {
        Ok(mut mac) => {
            mac.update(payload);
            // constant time
            mac.verify_slice(signature).is_ok()
        }
        Err(_) => false,
    }
}
