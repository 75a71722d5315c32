use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::store::PartitionKey;

/// An entity stored as one JSON document in its own partition.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human readable entity name used in logs.
    const KIND: &'static str;

    /// The document id.
    fn id(&self) -> &str;

    /// The partition holding this document. Always the document's own id.
    fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.id())
    }
}

/// Deserializes `null` as the type's default value.
///
/// Documents written by older clients carry `null` for empty lists.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
