//! In-memory identity store
//!
//! Passwords are only kept as HMAC digests keyed with a random per-process
//! pepper, and compared in constant time.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use auth::{AuthError, Credential, IdentityStore, VerifiedIdentity};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Identity store for development and small deployments
pub struct InMemoryIdentityStore {
    pepper: [u8; 32],
    users: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        let mut pepper = [0u8; 32];
        pepper[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        pepper[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        Self {
            pepper,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store seeded with the given accounts
    pub fn with_users<'a>(users: impl IntoIterator<Item = &'a Credential>) -> Self {
        let store = Self::new();
        for user in users {
            store.add_user(&user.email, &user.password);
        }
        store
    }

    /// Add or replace an account
    pub fn add_user(&self, email: &str, password: &str) {
        let digest = self.digest(password).finalize().into_bytes().to_vec();
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(normalize(email), digest);
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn digest(&self, password: &str) -> HmacSha256 {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.pepper)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(password.as_bytes());
        mac
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn verify(&self, credential: &Credential) -> Result<VerifiedIdentity, AuthError> {
        let email = normalize(&credential.email);
        let stored = self
            .users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&email)
            .cloned();

        // Unknown accounts still pay for one digest comparison.
        let candidate = self.digest(&credential.password);
        let matched = match stored {
            Some(digest) => candidate.verify_slice(&digest).is_ok(),
            None => {
                let _ = candidate.verify_slice(&[0u8; 32]);
                false
            }
        };

        if matched {
            Ok(VerifiedIdentity::new(email))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
