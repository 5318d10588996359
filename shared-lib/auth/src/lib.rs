//! Authentication library for microservices.
//!
//! The authentication server uses [`Issuer`] to turn verified credentials
//! into signed, time-bound tokens. Every microservice embeds a [`Verifier`]
//! (usually through [`middleware::require_auth`]) that validates those
//! tokens locally with the shared signing keys, without calling back to
//! the server.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod issuer;
pub mod middleware;
pub mod signer;
pub mod verifier;

pub use claims::{AuthResult, ClaimValue, ExtensionClaims, Identity, Payload};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodecError, Token};
pub use config::{AuthConfig, ConfigError, DEFAULT_TOKEN_TTL};
pub use error::AuthError;
pub use issuer::{Credential, IdentityStore, Issuer, VerifiedIdentity};
pub use middleware::{attach_auth, require_auth, AuthOutcome, AuthRejection, RequestContext};
pub use signer::{KeySet, SignatureAlgorithm, SignerError, SigningKey};
pub use verifier::{bearer_token, Verifier};
