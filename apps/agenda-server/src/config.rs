//! Server configuration.

use std::env;

use auth::{GOOGLE_ISSUER_URL, OidcConfig};

/// Database URL that selects the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// `memory` or a `sqlite:` URL.
    pub database_url: String,
    /// Secret used to sign session tokens.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// OIDC issuer URL.
    pub oidc_issuer_url: String,
    /// OIDC client ID.
    pub oidc_client_id: Option<String>,
    /// OIDC client secret.
    pub oidc_client_secret: Option<String>,
    /// OIDC redirect URL.
    pub oidc_redirect_url: Option<String>,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("AGENDA_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("AGENDA_JWT_SECRET is required"))?;

        Ok(Self {
            host: env::var("AGENDA_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("AGENDA_SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_url: env::var("AGENDA_DATABASE_URL")
                .unwrap_or_else(|_| MEMORY_DATABASE_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: env::var("AGENDA_JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| auth::DEFAULT_JWT_EXPIRATION_HOURS.to_string())
                .parse()
                .unwrap_or(auth::DEFAULT_JWT_EXPIRATION_HOURS),
            oidc_issuer_url: env::var("AGENDA_OIDC_ISSUER_URL")
                .unwrap_or_else(|_| GOOGLE_ISSUER_URL.to_string()),
            oidc_client_id: env::var("AGENDA_OIDC_CLIENT_ID").ok(),
            oidc_client_secret: env::var("AGENDA_OIDC_CLIENT_SECRET").ok(),
            oidc_redirect_url: env::var("AGENDA_OIDC_REDIRECT_URL").ok(),
            log_level: env::var("AGENDA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the OIDC configuration if client ID, secret and redirect URL are all set.
    pub fn oidc_config(&self) -> Option<OidcConfig> {
        match (
            &self.oidc_client_id,
            &self.oidc_client_secret,
            &self.oidc_redirect_url,
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(OidcConfig::new(
                self.oidc_issuer_url.clone(),
                client_id.clone(),
                client_secret.clone(),
                redirect_url.clone(),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "AGENDA_SERVER_HOST",
        "AGENDA_SERVER_PORT",
        "AGENDA_DATABASE_URL",
        "AGENDA_JWT_SECRET",
        "AGENDA_JWT_EXPIRATION_HOURS",
        "AGENDA_OIDC_ISSUER_URL",
        "AGENDA_OIDC_CLIENT_ID",
        "AGENDA_OIDC_CLIENT_SECRET",
        "AGENDA_OIDC_REDIRECT_URL",
        "AGENDA_LOG_LEVEL",
    ];

    // Both scenarios share one test: the process environment is global.
    #[test]
    fn test_from_env() {
        // SAFETY: no other test in this crate touches these variables
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
        }

        assert!(Config::from_env().is_err());

        unsafe {
            env::set_var("AGENDA_JWT_SECRET", "secret");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url, MEMORY_DATABASE_URL);
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.oidc_issuer_url, GOOGLE_ISSUER_URL);
        assert_eq!(config.log_level, "info");
        assert!(config.oidc_config().is_none());

        unsafe {
            env::set_var("AGENDA_SERVER_PORT", "9000");
            env::set_var("AGENDA_OIDC_CLIENT_ID", "client");
            env::set_var("AGENDA_OIDC_CLIENT_SECRET", "shh");
            env::set_var("AGENDA_OIDC_REDIRECT_URL", "http://localhost/callback");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9000);
        let oidc = config.oidc_config().unwrap();
        assert_eq!(oidc.client_id, "client");
        assert_eq!(oidc.prompt.as_deref(), Some(auth::SELECT_ACCOUNT_PROMPT));
    }
}
