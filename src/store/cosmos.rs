//! Cosmos DB SQL REST API client.
//!
//! Requests are signed with the account master key: an HMAC-SHA256 over
//! `verb\nresourceType\nresourceLink\ndate\n\n` (verb, type and date
//! lowercased), base64 encoded and url encoded into the `authorization`
//! header.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{Container, PartitionKey, QueryPage, StoreError, StoreResult};

type HmacSha256 = Hmac<Sha256>;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

/// Maximum documents requested per query page.
pub const MAX_ITEM_COUNT: u32 = 100;

const DOCS: &str = "docs";

/// A Cosmos DB account scoped to one database.
#[derive(Clone)]
pub struct CosmosStore {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    key: Arc<Zeroizing<Vec<u8>>>,
}

impl CosmosStore {
    /// Creates a client for `database` on the account at `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The account URL, e.g. `https://myaccount.documents.azure.com:443/`.
    /// * `master_key` - The base64 encoded account key.
    /// * `database` - The database name.
    pub fn new(endpoint: &str, master_key: &str, database: &str) -> StoreResult<Self> {
        let key = STANDARD
            .decode(master_key.trim())
            .map_err(|e| StoreError::Configuration(format!("Invalid Cosmos DB key: {e}")))?;

        if database.is_empty() {
            return Err(StoreError::Configuration(
                "Cosmos DB database name must be set".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            database: database.to_string(),
            key: Arc::new(Zeroizing::new(key)),
        })
    }

    /// Returns a handle on one container of the database.
    pub fn container(&self, id: &str) -> CosmosContainer {
        CosmosContainer {
            store: self.clone(),
            id: id.to_string(),
            link: format!("dbs/{}/colls/{}", self.database, id),
        }
    }

    /// Builds the master-key `authorization` header value.
    fn authorization(
        &self,
        verb: &Method,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> StoreResult<String> {
        master_key_authorization(&self.key, verb, resource_type, resource_link, date)
    }

    fn request(
        &self,
        method: Method,
        resource_link: &str,
        path: &str,
    ) -> StoreResult<RequestBuilder> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization = self.authorization(&method, DOCS, resource_link, &date)?;

        Ok(self
            .http
            .request(method, format!("{}/{}", self.endpoint, path))
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION))
    }
}

pub(crate) fn master_key_authorization(
    key: &[u8],
    verb: &Method,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> StoreResult<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.as_str().to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::Configuration(format!("Invalid Cosmos DB key: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let token = format!("type=master&ver=1.0&sig={signature}");
    Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
}

fn partition_header(partition_key: &PartitionKey) -> StoreResult<String> {
    Ok(sonic_rs::to_string(&[partition_key.as_str()])?)
}

/// Turns a non-success response into the matching `StoreError`.
async fn check_status(response: Response, id: &str) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        404 => StoreError::NotFound(id.to_string()),
        409 => StoreError::Conflict(id.to_string()),
        code => StoreError::Status {
            status: code,
            message,
        },
    })
}

async fn body_or_none(response: Response) -> StoreResult<Option<Vec<u8>>> {
    let body = response.bytes().await?;
    Ok((!body.is_empty()).then(|| body.to_vec()))
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<sonic_rs::Value>,
}

/// One container of a [`CosmosStore`].
#[derive(Clone)]
pub struct CosmosContainer {
    store: CosmosStore,
    id: String,
    link: String,
}

impl CosmosContainer {
    fn item_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.link, id)
    }
}

#[async_trait]
impl Container for CosmosContainer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create_item(
        &self,
        partition_key: &PartitionKey,
        item: Vec<u8>,
    ) -> StoreResult<Option<Vec<u8>>> {
        let path = format!("{}/docs", self.link);
        let response = self
            .store
            .request(Method::POST, &self.link, &path)?
            .header("x-ms-documentdb-partitionkey", partition_header(partition_key)?)
            .header("content-type", "application/json")
            .body(item)
            .send()
            .await?;

        let response = check_status(response, partition_key.as_str()).await?;
        body_or_none(response).await
    }

    async fn read_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<Vec<u8>> {
        let link = self.item_link(id);
        let response = self
            .store
            .request(Method::GET, &link, &link)?
            .header("x-ms-documentdb-partitionkey", partition_header(partition_key)?)
            .send()
            .await?;

        let response = check_status(response, id).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn replace_item(
        &self,
        partition_key: &PartitionKey,
        id: &str,
        item: Vec<u8>,
    ) -> StoreResult<Option<Vec<u8>>> {
        let link = self.item_link(id);
        let response = self
            .store
            .request(Method::PUT, &link, &link)?
            .header("x-ms-documentdb-partitionkey", partition_header(partition_key)?)
            .header("content-type", "application/json")
            .body(item)
            .send()
            .await?;

        let response = check_status(response, id).await?;
        body_or_none(response).await
    }

    async fn delete_item(&self, partition_key: &PartitionKey, id: &str) -> StoreResult<()> {
        let link = self.item_link(id);
        let response = self
            .store
            .request(Method::DELETE, &link, &link)?
            .header("x-ms-documentdb-partitionkey", partition_header(partition_key)?)
            .send()
            .await?;

        check_status(response, id).await?;
        Ok(())
    }

    async fn query_items(
        &self,
        query: &str,
        partition_key: Option<&PartitionKey>,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        let path = format!("{}/docs", self.link);
        let body = sonic_rs::to_vec(&sonic_rs::json!({
            "query": query,
            "parameters": []
        }))?;

        let mut request = self
            .store
            .request(Method::POST, &self.link, &path)?
            .header("x-ms-documentdb-isquery", "True")
            .header("content-type", "application/query+json")
            .header("x-ms-max-item-count", MAX_ITEM_COUNT.to_string());

        request = match partition_key {
            Some(key) => request.header("x-ms-documentdb-partitionkey", partition_header(key)?),
            None => request.header("x-ms-documentdb-query-enablecrosspartition", "True"),
        };
        if let Some(token) = continuation {
            request = request.header("x-ms-continuation", token);
        }

        let response = request.body(body).send().await?;
        let response = check_status(response, &self.id).await?;

        let next = response
            .headers()
            .get("x-ms-continuation")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        let parsed: QueryResponse = sonic_rs::from_slice(&bytes)?;
        let items = parsed
            .documents
            .iter()
            .map(sonic_rs::to_vec)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "📄 Cosmos query page on {}: {} documents, more: {}",
            self.id,
            items.len(),
            next.is_some()
        );

        Ok(QueryPage {
            items,
            continuation: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_requests_with_the_master_key() {
        let key = STANDARD
            .decode("dsZQi3KtZmCv1ljt3VNWNm7sQUF1y5rJfC6kv5JiwvW0EndXdDku/dkKBp8/ufDToSxLzR4y+O/0H/t4bQtVNw==")
            .unwrap();

        let header = master_key_authorization(
            &key,
            &Method::GET,
            "dbs",
            "dbs/ToDoList",
            "Thu, 27 Apr 2017 00:51:12 GMT",
        )
        .unwrap();

        assert_eq!(
            header,
            "type%3Dmaster%26ver%3D1.0%26sig%3Dc09PEVJrgp2uQRkr934kFbTqhByc7TVr3OHyqlu%2Bc%2Bc%3D"
        );
    }

    #[test]
    fn rejects_a_key_that_is_not_base64() {
        let result = CosmosStore::new("https://localhost:8081/", "not base64!", "conferenti");
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }

    #[test]
    fn partition_header_is_a_json_array() {
        let header = partition_header(&PartitionKey::new("s-1")).unwrap();
        assert_eq!(header, r#"["s-1"]"#);
    }
}
