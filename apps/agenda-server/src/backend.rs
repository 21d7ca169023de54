//! Storage and identity backends selected by configuration.

use std::sync::Arc;

use agenda_store::{
    DocumentStore, MemoryDocumentStore, SqliteDocumentStore, appointment_rules,
};
use anyhow::Context;
use auth::OidcClient;

use crate::config::{Config, MEMORY_DATABASE_URL};

/// The document store and, when configured, the OIDC client.
#[derive(Clone)]
pub struct Backend {
    /// Store holding appointments, configured with the appointment rules.
    pub store: Arc<dyn DocumentStore>,
    /// OIDC client for popup sign-in. `None` disables the sign-in endpoints.
    pub oidc: Option<OidcClient>,
}

impl Backend {
    /// In-memory store without sign-in.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(MemoryDocumentStore::new(appointment_rules())),
            oidc: None,
        }
    }

    /// Replaces the OIDC client.
    pub fn with_oidc(mut self, oidc: OidcClient) -> Self {
        self.oidc = Some(oidc);
        self
    }

    /// Opens the store named by `database_url` and discovers the OIDC provider.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = if config.database_url == MEMORY_DATABASE_URL {
            tracing::info!("Using in-memory document store");
            Arc::new(MemoryDocumentStore::new(appointment_rules()))
        } else if config.database_url.starts_with("sqlite:") {
            tracing::info!(url = %config.database_url, "Using SQLite document store");
            let store = SqliteDocumentStore::connect(&config.database_url, appointment_rules())
                .await
                .context("failed to open SQLite document store")?;
            Arc::new(store)
        } else {
            anyhow::bail!(
                "unsupported AGENDA_DATABASE_URL {:?}: expected \"memory\" or a sqlite: URL",
                config.database_url
            );
        };

        let oidc = match config.oidc_config() {
            Some(oidc_config) => Some(
                OidcClient::discover(oidc_config)
                    .await
                    .context("OIDC discovery failed")?,
            ),
            None => {
                tracing::warn!("OIDC is not configured; sign-in endpoints are disabled");
                None
            }
        };

        Ok(Self { store, oidc })
    }
}
