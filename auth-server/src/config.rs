use auth::{AuthConfig, ConfigError, Credential};

/// Authentication server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address
    pub bind_addr: String,

    /// Signing keys and token lifetime
    pub auth: AuthConfig,

    /// Accounts seeded into the in-memory identity store
    pub users: Vec<Credential>,

    /// Service version
    pub version: String,
}

impl ServerConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:1337";

    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind_addr: Self::DEFAULT_BIND_ADDR.to_string(),
            auth,
            users: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(AuthConfig::from_lookup(&lookup)?);

        if let Some(addr) = lookup("AUTH_BIND_ADDR").filter(|v| !v.is_empty()) {
            config.bind_addr = addr;
        }

        if let Some(users) = lookup("AUTH_USERS") {
            config.users = parse_users(&users)?;
        }

        Ok(config)
    }
}

/// Parse `email:password` pairs separated by `;`.
pub fn parse_users(value: &str) -> Result<Vec<Credential>, ConfigError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((email, password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok(Credential::new(email.trim(), password))
            }
            _ => Err(ConfigError::Invalid {
                name: "AUTH_USERS",
                reason: "expected email:password entries separated by ';'".to_string(),
            }),
        })
        .collect()
}
