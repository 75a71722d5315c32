//! Partitioned document store.
//!
//! A [`Container`] holds JSON documents addressed by `(partition key, id)`.
//! Two implementations exist: [`memory::MemoryContainer`] for local runs and
//! tests, and [`cosmos::CosmosContainer`] which talks to the Cosmos DB SQL
//! REST API.

pub mod cosmos;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// The full-scan query used for cross-partition listing.
pub const SELECT_ALL: &str = "SELECT * FROM c";

/// The value that decides which partition holds a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Creates a partition key from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the partition key value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The document store's error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A document with the same id already exists in the partition.
    #[error("Document already exists: {0}")]
    Conflict(String),

    /// The store answered with an unexpected status.
    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never got a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The query is not supported by this store.
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// The store client is misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<sonic_rs::Error> for StoreError {
    fn from(e: sonic_rs::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// A `Result` type that uses `StoreError` as the error type.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One page of query results.
#[derive(Debug, Default)]
pub struct QueryPage {
    /// The raw JSON documents in this page.
    pub items: Vec<Vec<u8>>,
    /// Token to pass back for the next page, `None` once exhausted.
    pub continuation: Option<String>,
}

/// A logical container of JSON documents.
///
/// Every operation is a single round trip. Items are raw JSON bytes; the
/// container never interprets them beyond reading the `id` field.
#[async_trait]
pub trait Container: Send + Sync {
    /// The container's name.
    fn id(&self) -> &str;

    /// Inserts a new document. Returns the stored document when the store
    /// echoes content on write.
    async fn create_item(&self, partition_key: &PartitionKey, item: Vec<u8>)
    -> StoreResult<Option<Vec<u8>>>;

    /// Reads one document.
    async fn read_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<Vec<u8>>;

    /// Replaces an existing document.
    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        item: Vec<u8>,
    ) -> StoreResult<Option<Vec<u8>>>;

    /// Deletes one document.
    async fn delete_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<()>;

    /// Fetches one page of a query. A `None` partition key scans every
    /// partition.
    async fn query_items(
        &self,
        query: &str,
        partition_key: Option<&PartitionKey>,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage>;
}

/// Walks the pages of a query until the store reports no continuation.
pub struct QueryPager {
    container: Arc<dyn Container>,
    query: String,
    partition_key: Option<PartitionKey>,
    continuation: Option<String>,
    started: bool,
}

impl QueryPager {
    /// Creates a pager. Nothing is fetched until [`QueryPager::next_page`].
    pub fn new(
        container: Arc<dyn Container>,
        query: impl Into<String>,
        partition_key: Option<PartitionKey>,
    ) -> Self {
        Self {
            container,
            query: query.into(),
            partition_key,
            continuation: None,
            started: false,
        }
    }

    /// Whether another page can be fetched.
    pub fn more(&self) -> bool {
        !self.started || self.continuation.is_some()
    }

    /// Fetches the next page.
    pub async fn next_page(&mut self) -> StoreResult<QueryPage> {
        let page = self
            .container
            .query_items(
                &self.query,
                self.partition_key.as_ref(),
                self.continuation.as_deref(),
            )
            .await?;

        self.started = true;
        self.continuation = page.continuation.clone();
        Ok(page)
    }
}
