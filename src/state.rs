use std::sync::Arc;

use anyhow::Context;

use crate::{
    auth::{
        keys::{HttpJwksSource, KeyProvider},
        token::TokenValidator,
    },
    config::Config,
    db::{Containers, create_containers},
    repositories::{SessionRepository, SpeakerRepository},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The issuer's signing keys.
    pub key_provider: Arc<KeyProvider>,
    /// Verifies bearer tokens.
    pub token_validator: Arc<TokenValidator>,
    /// The session repository.
    pub sessions: SessionRepository,
    /// The speaker repository.
    pub speakers: SpeakerRepository,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// Fetches the issuer's key set once; failure aborts startup.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let source = HttpJwksSource::new(config.auth.jwks_uri())
            .context("Failed to build the JWKS client")?;
        tracing::info!("🔑 Loading signing keys from {}", source.uri());

        let key_provider = KeyProvider::new(Arc::new(source), config.auth.jwks_refresh_interval)
            .await
            .context("Failed to load the issuer's signing keys")?;
        tracing::info!(
            "✅ Key provider initialized with {} keys",
            key_provider.key_count()
        );

        let containers =
            create_containers(&config.cosmos).context("Failed to open the document store")?;
        tracing::info!("✅ Document store containers initialized");

        Ok(Self::from_parts(
            config.clone(),
            Arc::new(key_provider),
            containers,
        ))
    }

    /// Assembles the state from already constructed parts.
    pub fn from_parts(config: Config, key_provider: Arc<KeyProvider>, containers: Containers) -> Self {
        let token_validator = Arc::new(TokenValidator::new(
            Arc::clone(&key_provider),
            config.auth.issuer(),
            config.auth.audience.clone(),
        ));

        tracing::debug!(
            "Token validator expects issuer {} and audience {}",
            token_validator.issuer(),
            token_validator.audience()
        );

        Self {
            sessions: SessionRepository::new(containers.sessions),
            speakers: SpeakerRepository::new(containers.speakers),
            config,
            key_provider,
            token_validator,
        }
    }
}
