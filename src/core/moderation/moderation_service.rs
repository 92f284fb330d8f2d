// Moderation service - the whole per-event workflow.
//
//   Received -> Validated -> (Skipped | Invoking) -> (Updated | UpdateFailed) -> Responded
//
// Every failure ends up as an `InvocationResult`; nothing here returns Err or
// panics, so the hosting platform always gets a structured answer.

use super::moderation_models::{
    ImageStatus, InvocationResult, ModerationRequest, ANALYSIS_FIELD, DATABASE_FAILURE_MESSAGE,
    ERROR_VERDICT, FALLBACK_VERDICT, SKIP_REASON_MISSING_TASK,
};
use crate::core::ai::{ContentPart, GenerativeModel, InlineImage, ModelResponse, SafetySettings};
use crate::core::documents::DocumentStore;
use crate::core::intake::{self, IntakeOutcome, ModerationJob};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// IMAGE FETCH PORT
// ============================================================================

#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("Image request failed: {0}")]
    Transport(String),

    #[error("Image server returned status {0}")]
    Status(u16),

    #[error("Image response body was empty")]
    Empty,
}

/// Downloads an image and hands it back ready for inline attachment.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<InlineImage, ImageFetchError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<M: GenerativeModel, F: ImageFetcher, S: DocumentStore> {
    model: M,
    images: F,
    store: S,
    safety: SafetySettings,
}

impl<M: GenerativeModel, F: ImageFetcher, S: DocumentStore> ModerationService<M, F, S> {
    /// Creates the service with every harm category set to never block.
    pub fn new(model: M, images: F, store: S) -> Self {
        Self {
            model,
            images,
            store,
            safety: SafetySettings::permissive(),
        }
    }

    /// Runs one invocation from raw event body to structured result.
    pub async fn handle_event(&self, body: &[u8]) -> InvocationResult {
        let job = match intake::decode_body(body).and_then(intake::parse_event) {
            Ok(IntakeOutcome::Ready(job)) => job,
            Ok(IntakeOutcome::Skipped { .. }) => {
                return InvocationResult::skipped(SKIP_REASON_MISSING_TASK);
            }
            Err(e) => {
                tracing::error!("Rejecting event: {}", e);
                return InvocationResult::error(e.to_string());
            }
        };

        self.moderate(&job).await
    }

    /// Asks the model about a validated job and writes the verdict back.
    ///
    /// The write is attempted even when the verdict is a degraded fallback, so
    /// a document is never left without an analysis after a model failure.
    pub async fn moderate(&self, job: &ModerationJob) -> InvocationResult {
        let document_id = &job.document.document_id;

        let (request, image_status) = self.build_request(job).await;
        let verdict = self.check_content(&request).await;
        tracing::info!(document_id = %document_id, ai_response = %verdict, "AI response");

        let mut fields = Map::new();
        fields.insert(ANALYSIS_FIELD.to_string(), Value::String(verdict.clone()));

        if let Err(e) = self.store.update_document(&job.document, fields).await {
            tracing::error!(document_id = %document_id, "Database update error: {}", e);
            return InvocationResult::error(DATABASE_FAILURE_MESSAGE);
        }

        tracing::info!(document_id = %document_id, "Document updated successfully");
        InvocationResult::success(verdict, image_status)
    }

    /// Turns intake output into a model request, fetching the image if one was linked.
    ///
    /// A failed fetch drops the image and reports `ImageStatus::FetchFailed`;
    /// the request still goes out text-only.
    pub async fn build_request(&self, job: &ModerationJob) -> (ModerationRequest, ImageStatus) {
        let (image, status) = match job.image_url.as_deref() {
            None => (None, ImageStatus::NotSupplied),
            Some(url) => match self.images.fetch(url).await {
                Ok(inline) => {
                    tracing::debug!(
                        document_id = %job.document.document_id,
                        mime_type = %inline.mime_type,
                        "Attached image inline"
                    );
                    (Some(inline), ImageStatus::Attached)
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = %job.document.document_id,
                        image_url = %url,
                        "Image fetch failed, moderating text only: {}",
                        e
                    );
                    (None, ImageStatus::FetchFailed)
                }
            },
        };

        let request = ModerationRequest {
            task: job.task.clone(),
            text: job.text.clone(),
            image,
        };
        (request, status)
    }

    /// Calls the model and reduces whatever comes back to a verdict string.
    pub async fn check_content(&self, request: &ModerationRequest) -> String {
        let parts = request_parts(request);

        match self.model.generate_content(&parts, &self.safety).await {
            Ok(response) => extract_verdict(&response),
            Err(e) => {
                tracing::error!("AI analysis failed: {}", e);
                ERROR_VERDICT.to_string()
            }
        }
    }
}

// ============================================================================
// REQUEST / RESPONSE HELPERS
// ============================================================================

/// The moderation prompt. Task and content are embedded verbatim.
pub fn build_prompt(task: &str, text: &str) -> String {
    format!(
        "This is the description of the task to be performed: {task}\n\
         \n\
         Below are the content and images that need to be moderated:\n\
         - Content: {text}\n\
         \n\
         Please check if the content and poster are suitable for the task.\n\
         If not, please explain the reason.\n"
    )
}

/// Prompt first, then the image if there is one.
pub fn request_parts(request: &ModerationRequest) -> Vec<ContentPart> {
    let mut parts = vec![ContentPart::Text(build_prompt(&request.task, &request.text))];

    if let Some(image) = &request.image {
        parts.push(ContentPart::InlineImage(image.clone()));
    }

    parts
}

/// The model's text, or the fixed fallback when there isn't any.
pub fn extract_verdict(response: &ModelResponse) -> String {
    match response.text() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => {
            tracing::warn!(
                finish_reason = ?response.finish_reason,
                block_reason = ?response.block_reason,
                "Model returned no text"
            );
            FALLBACK_VERDICT.to_string()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
