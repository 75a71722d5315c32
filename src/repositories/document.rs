use std::{marker::PhantomData, sync::Arc};

use crate::{
    error::{AppError, Result},
    models::document::Document,
    store::{Container, PartitionKey, QueryPager, SELECT_ALL, StoreError},
};

/// Reads and writes one entity type in one container.
///
/// Every document lives in its own partition: the partition key is always the
/// document id.
pub struct DocumentRepository<T> {
    container: Arc<dyn Container>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
            _entity: PhantomData,
        }
    }
}

impl<T: Document> DocumentRepository<T> {
    /// Creates a repository over `container`.
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self {
            container,
            _entity: PhantomData,
        }
    }

    /// Inserts a new document.
    ///
    /// # Arguments
    ///
    /// * `entity` - The entity to store. Its id is also its partition key.
    ///
    /// # Returns
    ///
    /// A `Result` containing the stored entity as the store echoed it, or the
    /// input when the store returns no content.
    pub async fn create(&self, entity: T) -> Result<T> {
        let body = encode(&entity).map_err(AppError::StoreWrite)?;

        let echoed = self
            .container
            .create_item(&entity.partition_key(), body)
            .await
            .map_err(|e| {
                tracing::error!("❌ Failed to create {} {}: {}", T::KIND, entity.id(), e);
                AppError::StoreWrite(e)
            })?;

        tracing::debug!("✅ Created {} {}", T::KIND, entity.id());
        echoed_or(echoed, entity).map_err(AppError::StoreWrite)
    }

    /// Lists every document of the container with a cross-partition scan.
    ///
    /// Pages are accumulated until the store reports no continuation. Any page
    /// failure discards what was read so far.
    ///
    /// # Returns
    ///
    /// A `Result` containing every entity.
    pub async fn get_all(&self) -> Result<Vec<T>> {
        let mut pager = QueryPager::new(Arc::clone(&self.container), SELECT_ALL, None);
        let mut entities = Vec::new();
        let mut pages = 0usize;

        while pager.more() {
            let page = pager.next_page().await.map_err(|e| {
                tracing::error!(
                    "❌ Failed to scan {} page {} of {}: {}",
                    T::KIND,
                    pages + 1,
                    self.container.id(),
                    e
                );
                AppError::StoreRead(e)
            })?;
            pages += 1;

            for item in page.items {
                entities.push(decode::<T>(&item).map_err(AppError::StoreRead)?);
            }
        }

        tracing::debug!(
            "📄 Scanned {} {} documents in {} pages",
            entities.len(),
            T::KIND,
            pages
        );
        Ok(entities)
    }

    /// Reads one document.
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        let item = self
            .container
            .read_item(&PartitionKey::new(id), id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => AppError::NotFound,
                e => AppError::StoreRead(e),
            })?;

        decode(&item).map_err(AppError::StoreRead)
    }

    /// Replaces an existing document.
    ///
    /// # Returns
    ///
    /// A `Result` containing the entity as the store echoed it, or the input
    /// when the store returns no content.
    pub async fn update(&self, entity: T) -> Result<T> {
        let body = encode(&entity).map_err(AppError::StoreWrite)?;

        let echoed = self
            .container
            .replace_item(&entity.partition_key(), entity.id(), body)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    tracing::debug!("{} {} not found for update", T::KIND, entity.id());
                    AppError::NotFound
                }
                e => {
                    tracing::error!("❌ Failed to update {} {}: {}", T::KIND, entity.id(), e);
                    AppError::StoreWrite(e)
                }
            })?;

        tracing::debug!("✅ Updated {} {}", T::KIND, entity.id());
        echoed_or(echoed, entity).map_err(AppError::StoreWrite)
    }

    /// Deletes one document.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted id.
    pub async fn delete(&self, id: &str) -> Result<String> {
        self.container
            .delete_item(&PartitionKey::new(id), id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    tracing::debug!("{} {} not found for delete", T::KIND, id);
                    AppError::NotFound
                }
                e => {
                    tracing::error!("❌ Failed to delete {} {}: {}", T::KIND, id, e);
                    AppError::StoreWrite(e)
                }
            })?;

        tracing::debug!("🗑️ Deleted {} {}", T::KIND, id);
        Ok(id.to_string())
    }
}

fn encode<T: Document>(entity: &T) -> std::result::Result<Vec<u8>, StoreError> {
    Ok(sonic_rs::to_vec(entity)?)
}

fn decode<T: Document>(item: &[u8]) -> std::result::Result<T, StoreError> {
    Ok(sonic_rs::from_slice(item)?)
}

fn echoed_or<T: Document>(echoed: Option<Vec<u8>>, input: T) -> std::result::Result<T, StoreError> {
    match echoed {
        Some(item) => decode(&item),
        None => Ok(input),
    }
}
