use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use sonic_rs::JsonValueTrait;
use tokio::sync::RwLock;

use super::{Container, PartitionKey, QueryPage, SELECT_ALL, StoreError, StoreResult};

/// Default number of documents returned per query page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Partitions = BTreeMap<PartitionKey, BTreeMap<String, Vec<u8>>>;

/// An in-process document store holding any number of named containers.
#[derive(Clone)]
pub struct MemoryStore {
    containers: Arc<Mutex<HashMap<String, Arc<MemoryContainer>>>>,
    page_size: usize,
}

impl MemoryStore {
    /// Creates an empty store whose queries return `page_size` documents per page.
    pub fn new(page_size: usize) -> Self {
        Self {
            containers: Arc::new(Mutex::new(HashMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Returns the named container, creating it on first use.
    pub fn container(&self, id: &str) -> Arc<MemoryContainer> {
        let mut containers = self
            .containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        containers
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(MemoryContainer::new(id, self.page_size)))
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// A container whose documents live in a `partition -> id -> document` map.
pub struct MemoryContainer {
    id: String,
    page_size: usize,
    partitions: RwLock<Partitions>,
}

impl MemoryContainer {
    /// Creates an empty container.
    pub fn new(id: impl Into<String>, page_size: usize) -> Self {
        Self {
            id: id.into(),
            page_size: page_size.max(1),
            partitions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of partitions currently holding at least one document.
    pub async fn partition_count(&self) -> usize {
        self.partitions
            .read()
            .await
            .values()
            .filter(|docs| !docs.is_empty())
            .count()
    }
}

/// Reads the `id` field of a JSON document.
fn document_id(item: &[u8]) -> StoreResult<String> {
    let value: sonic_rs::Value = sonic_rs::from_slice(item)?;
    value
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Status {
            status: 400,
            message: "document is missing a non-empty id".to_string(),
        })
}

fn is_full_scan(query: &str) -> bool {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
    normalized.eq_ignore_ascii_case(SELECT_ALL)
}

#[async_trait]
impl Container for MemoryContainer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create_item(
        &self,
        partition_key: &PartitionKey,
        item: Vec<u8>,
    ) -> StoreResult<Option<Vec<u8>>> {
        let id = document_id(&item)?;
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(partition_key.clone()).or_default();

        if partition.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }

        partition.insert(id, item.clone());
        Ok(Some(item))
    }

    async fn read_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<Vec<u8>> {
        self.partitions
            .read()
            .await
            .get(partition_key)
            .and_then(|partition| partition.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        item: Vec<u8>,
    ) -> StoreResult<Option<Vec<u8>>> {
        let body_id = document_id(&item)?;
        if body_id != id {
            return Err(StoreError::Status {
                status: 400,
                message: format!("document id {body_id} does not match {id}"),
            });
        }

        let mut partitions = self.partitions.write().await;
        let existing = partitions
            .get_mut(partition_key)
            .and_then(|partition| partition.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        *existing = item.clone();
        Ok(Some(item))
    }

    async fn delete_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<()> {
        let mut partitions = self.partitions.write().await;
        partitions
            .get_mut(partition_key)
            .and_then(|partition| partition.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn query_items(
        &self,
        query: &str,
        partition_key: Option<&PartitionKey>,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        if !is_full_scan(query) {
            return Err(StoreError::UnsupportedQuery(query.to_string()));
        }

        let offset = match continuation {
            Some(token) => token.parse::<usize>().map_err(|_| StoreError::Status {
                status: 400,
                message: format!("invalid continuation token: {token}"),
            })?,
            None => 0,
        };

        let partitions = self.partitions.read().await;
        let documents: Vec<&Vec<u8>> = match partition_key {
            Some(key) => partitions
                .get(key)
                .map(|partition| partition.values().collect())
                .unwrap_or_default(),
            None => partitions
                .values()
                .flat_map(|partition| partition.values())
                .collect(),
        };

        let end = (offset + self.page_size).min(documents.len());
        let items = documents
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|doc| (*doc).clone())
            .collect();
        let continuation = (end < documents.len()).then(|| end.to_string());

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}
