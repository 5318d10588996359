//! Authorization policy
//!
//! Runs after authentication succeeded; a refusal here is a 403, never a 401.

use auth::{AuthError, Identity};

/// Allows subjects whose email belongs to one domain
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    suffix: String,
}

impl DomainPolicy {
    pub fn new(domain: &str) -> Self {
        Self {
            suffix: format!("@{}", domain.trim_start_matches('@').to_ascii_lowercase()),
        }
    }

    pub fn authorize(&self, identity: &Identity) -> Result<(), AuthError> {
        let subject = identity.subject.to_ascii_lowercase();
        if subject.len() > self.suffix.len() && subject.ends_with(&self.suffix) {
            Ok(())
        } else {
            tracing::info!("Denied {} (outside {})", identity.subject, self.suffix);
            Err(AuthError::Forbidden)
        }
    }
}
