//! Token wire format.
//!
//! A token is `<payload>.<signature>`, both segments base64url without
//! padding. The payload segment encodes the canonical JSON form of a
//! [`Payload`]: keys in lexicographic order (`exp`, `ext`, `iat`, `sub`),
//! no whitespace, `ext` omitted when empty. Decoding rejects anything that
//! would not re-encode to the same bytes, so the signed bytes are always
//! reproducible from a decoded payload.
//!
//! Nothing here checks integrity; see [`crate::signer`].

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::{ExtensionClaims, Payload};

/// Separator between payload and signature segments.
pub const SEGMENT_DELIMITER: char = '.';

/// Codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected 2 token segments, found {0}")]
    SegmentCount(usize),

    #[error("empty {0} segment")]
    EmptySegment(&'static str),

    #[error("invalid base64 in {segment} segment: {reason}")]
    Encoding { segment: &'static str, reason: String },

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("invalid claims: {0}")]
    Claims(String),

    #[error("payload is not in canonical form")]
    NonCanonical,
}

impl From<CodecError> for error::AuthError {
    fn from(err: CodecError) -> Self {
        error::AuthError::MalformedToken(err.to_string())
    }
}

/// Serialized payload; field order is the canonical key order.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePayload {
    exp: i64,
    #[serde(default, skip_serializing_if = "ExtensionClaims::is_empty")]
    ext: ExtensionClaims,
    iat: i64,
    sub: String,
}

/// Signed, header-safe token string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Payload segment (before the delimiter).
    pub fn payload_segment(&self) -> &str {
        self.0.split(SEGMENT_DELIMITER).next().unwrap_or_default()
    }

    /// Signature segment (after the delimiter).
    pub fn signature_segment(&self) -> &str {
        self.0.split(SEGMENT_DELIMITER).nth(1).unwrap_or_default()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are bearer credentials; keep them out of debug logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({} bytes)", self.0.len())
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A split token before its payload is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub payload_bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

fn validate(payload: &Payload) -> Result<(), CodecError> {
    if payload.subject.is_empty() {
        return Err(CodecError::Claims("subject must not be empty".to_string()));
    }
    if payload.expires_at <= payload.issued_at {
        return Err(CodecError::Claims(format!(
            "expires_at ({}) must be after issued_at ({})",
            payload.expires_at, payload.issued_at
        )));
    }
    if payload.claims.keys().any(|k| k.is_empty()) {
        return Err(CodecError::Claims("extension claim names must not be empty".to_string()));
    }
    Ok(())
}

/// Canonical bytes of a payload; these are the bytes that get signed.
pub fn canonical_bytes(payload: &Payload) -> Result<Vec<u8>, CodecError> {
    validate(payload)?;

    let wire = WirePayload {
        exp: payload.expires_at,
        ext: payload.claims.clone(),
        iat: payload.issued_at,
        sub: payload.subject.clone(),
    };

    serde_json::to_vec(&wire).map_err(|e| CodecError::Payload(e.to_string()))
}

/// Encode a payload into its token segment.
pub fn encode(payload: &Payload) -> Result<String, CodecError> {
    Ok(encode_segment(&canonical_bytes(payload)?))
}

/// Encode already-canonical payload bytes into a token segment.
pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Join an encoded payload segment and raw signature bytes into a token.
pub fn join(payload_segment: &str, signature: &[u8]) -> Token {
    let mut token = String::with_capacity(payload_segment.len() + 1 + signature.len() * 4 / 3 + 4);
    token.push_str(payload_segment);
    token.push(SEGMENT_DELIMITER);
    URL_SAFE_NO_PAD.encode_string(signature, &mut token);
    Token(token)
}

/// Split a token string into raw payload bytes and signature bytes.
///
/// Base64 decoding is strict: a final character with non-zero trailing bits
/// is an `Encoding` error, not a second spelling of the same bytes. Editing
/// a segment therefore either fails here or changes the decoded bytes, which
/// the signature check then rejects.
pub fn split(token: &str) -> Result<RawToken, CodecError> {
    let segments: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
    if segments.len() != 2 {
        return Err(CodecError::SegmentCount(segments.len()));
    }

    let (payload, signature) = (segments[0], segments[1]);
    if payload.is_empty() {
        return Err(CodecError::EmptySegment("payload"));
    }
    if signature.is_empty() {
        return Err(CodecError::EmptySegment("signature"));
    }

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| CodecError::Encoding {
        segment: "payload",
        reason: e.to_string(),
    })?;
    let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|e| CodecError::Encoding {
        segment: "signature",
        reason: e.to_string(),
    })?;

    Ok(RawToken {
        payload_bytes,
        signature,
    })
}

/// Parse canonical payload bytes.
pub fn decode_payload(bytes: &[u8]) -> Result<Payload, CodecError> {
    let wire: WirePayload =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Payload(e.to_string()))?;

    let payload = Payload {
        subject: wire.sub,
        issued_at: wire.iat,
        expires_at: wire.exp,
        claims: wire.ext,
    };

    if canonical_bytes(&payload)? != bytes {
        return Err(CodecError::NonCanonical);
    }

    Ok(payload)
}

/// Decode a full token into its payload without checking the signature.
pub fn decode(token: &str) -> Result<Payload, CodecError> {
    let raw = split(token)?;
    decode_payload(&raw.payload_bytes)
}
