use super::models::{ContentPart, ModelResponse, SafetySettings};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode model response: {0}")]
    Decode(String),
}

/// A generative model that can judge multimodal content.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Runs one generation over `parts` (text first, then at most one image).
    ///
    /// A refusal or a fully filtered response is `Ok` with no text, not an error.
    async fn generate_content(
        &self,
        parts: &[ContentPart],
        safety: &SafetySettings,
    ) -> Result<ModelResponse, ModelError>;
}
