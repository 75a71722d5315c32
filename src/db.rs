use std::sync::Arc;

use crate::{
    config::CosmosConfig,
    store::{Container, StoreResult, cosmos::CosmosStore, memory::MemoryStore},
};

/// The containers the application reads and writes.
#[derive(Clone)]
pub struct Containers {
    /// The container holding sessions.
    pub sessions: Arc<dyn Container>,
    /// The container holding speakers.
    pub speakers: Arc<dyn Container>,
}

impl Containers {
    /// Opens both containers on an in-process store.
    pub fn in_memory(store: &MemoryStore, config: &CosmosConfig) -> Self {
        Self {
            sessions: store.container(&config.session_container),
            speakers: store.container(&config.speaker_container),
        }
    }
}

/// Opens the document store containers.
///
/// # Arguments
///
/// * `config` - The document store settings. An empty endpoint selects the
///   in-memory store.
///
/// # Returns
///
/// A `Result` containing the `Containers`.
pub fn create_containers(config: &CosmosConfig) -> StoreResult<Containers> {
    if config.endpoint.is_empty() {
        tracing::warn!("⚠️ COSMOSDB_ENDPOINT not set, documents are kept in memory");
        return Ok(Containers::in_memory(&MemoryStore::default(), config));
    }

    let store = CosmosStore::new(&config.endpoint, &config.key, &config.database)?;
    tracing::info!(
        "✅ Cosmos DB client initialized for database '{}'",
        config.database
    );

    Ok(Containers {
        sessions: Arc::new(store.container(&config.session_container)),
        speakers: Arc::new(store.container(&config.speaker_container)),
    })
}

#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::*;

    fn cosmos_config(endpoint: &str, key: &str) -> CosmosConfig {
        CosmosConfig {
            endpoint: endpoint.to_string(),
            key: Zeroizing::new(key.to_string()),
            database: "conferenti".to_string(),
            speaker_container: "speakers".to_string(),
            session_container: "sessions".to_string(),
        }
    }

    #[test]
    fn empty_endpoint_uses_memory() {
        let containers = create_containers(&cosmos_config("", "")).unwrap();
        assert_eq!(containers.sessions.id(), "sessions");
        assert_eq!(containers.speakers.id(), "speakers");
    }

    #[test]
    fn cosmos_endpoint_opens_named_containers() {
        let containers =
            create_containers(&cosmos_config("https://localhost:8081", "a2V5")).unwrap();
        assert_eq!(containers.sessions.id(), "sessions");
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(create_containers(&cosmos_config("https://localhost:8081", "%%%")).is_err());
    }
}
