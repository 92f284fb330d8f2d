use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::documents::{DocumentRef, DocumentStore, DocumentStoreError};

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Minimal Appwrite Databases REST client. It only exposes the one call the core needs.
pub struct AppwriteClient {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

impl AppwriteClient {
    /// Builds a server-side client authenticated with a project API key.
    pub fn new(
        client: Client,
        endpoint: &str,
        project_id: &str,
        api_key: &str,
    ) -> Result<Self, DocumentStoreError> {
        let endpoint = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| DocumentStoreError::Transport(format!("invalid endpoint {endpoint:?}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-appwrite-project",
            HeaderValue::from_str(project_id)
                .map_err(|e| DocumentStoreError::Transport(format!("invalid project id: {e}")))?,
        );
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| DocumentStoreError::Transport(format!("invalid API key: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-appwrite-key", key);

        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }

    /// IDs are pushed as escaped path segments, never spliced in raw.
    fn document_url(&self, document: &DocumentRef) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "databases",
                document.database_id.as_str(),
                "collections",
                document.collection_id.as_str(),
                "documents",
                document.document_id.as_str(),
            ]);
        }
        url
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn update_document(
        &self,
        document: &DocumentRef,
        fields: Map<String, Value>,
    ) -> Result<(), DocumentStoreError> {
        let url = self.document_url(document);
        tracing::debug!("PATCH {}", url);

        let resp = self
            .client
            .patch(url)
            .headers(self.headers.clone())
            .json(&json!({ "data": fields }))
            .send()
            .await
            .map_err(|e| DocumentStoreError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AppwriteErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("Appwrite returned {} for document update", status));

        Err(DocumentStoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
