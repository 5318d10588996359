//! Report Service
//!
//! A microservice that trusts tokens from the authentication server without
//! calling it: requests are verified locally by the shared `auth`
//! middleware, then a domain policy decides who may read reports.

pub mod policy;
pub mod routes;

pub use policy::DomainPolicy;
pub use routes::{router, Report, ReportState};

use auth::{AuthConfig, ConfigError};

/// Service configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub bind_addr: String,
    pub allowed_domain: String,
    pub auth: AuthConfig,
}

impl ReportConfig {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind_addr: String::from("0.0.0.0:1338"),
            allowed_domain: String::from("scalehaus.io"),
            auth,
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(AuthConfig::from_lookup(&lookup)?);

        if let Some(addr) = lookup("REPORT_BIND_ADDR").filter(|v| !v.is_empty()) {
            config.bind_addr = addr;
        }

        if let Some(domain) = lookup("REPORT_ALLOWED_DOMAIN").filter(|v| !v.is_empty()) {
            config.allowed_domain = domain;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::from_lookup(|name| {
            (name == "AUTH_SIGNING_KEY").then(|| "secret".to_string())
        })
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:1338");
        assert_eq!(config.allowed_domain, "scalehaus.io");
    }

    #[test]
    fn test_overrides() {
        let config = ReportConfig::from_lookup(|name| match name {
            "AUTH_SIGNING_KEY" => Some("secret".to_string()),
            "REPORT_ALLOWED_DOMAIN" => Some("example.com".to_string()),
            "REPORT_BIND_ADDR" => Some("127.0.0.1:9000".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.allowed_domain, "example.com");
    }
}
