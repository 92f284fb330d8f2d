// Database port. The core only knows "update these fields on that document";
// the Appwrite REST details live in infra.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("Database transport error: {0}")]
    Transport(String),

    #[error("Database API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Fully qualified location of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub database_id: String,
    pub collection_id: String,
    pub document_id: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Sets `fields` on the document, leaving every other field untouched.
    async fn update_document(
        &self,
        document: &DocumentRef,
        fields: Map<String, Value>,
    ) -> Result<(), DocumentStoreError>;
}
