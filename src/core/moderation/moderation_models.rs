// Moderation domain models - the request we build and the result we hand back.
//
// No HTTP or database types here.

use crate::core::ai::InlineImage;
use serde::Serialize;

/// Document field the verdict is written to.
pub const ANALYSIS_FIELD: &str = "ai_analysis";

/// Verdict recorded when the model answers with no text.
pub const FALLBACK_VERDICT: &str = "Unable to analyze content.";

/// Verdict recorded when the model call itself fails.
pub const ERROR_VERDICT: &str = "AI analysis encountered an error.";

pub const SKIP_REASON_MISSING_TASK: &str = "missing task description";

pub const DATABASE_FAILURE_MESSAGE: &str = "Failed to update database";

/// Inputs for one moderation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationRequest {
    pub task: String,
    pub text: String,
    /// Already fetched and encoded; `None` means text-only.
    pub image: Option<InlineImage>,
}

/// What happened to the image the document pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    NotSupplied,
    Attached,
    /// A URL was given but the fetch failed; moderation ran text-only.
    FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Skipped,
    Error,
}

/// The structured result returned to the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub status: InvocationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Only set (to `false`) when an image URL was supplied but could not be
    /// fetched, so callers can tell that apart from "no image".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_attached: Option<bool>,
}

impl InvocationResult {
    pub fn success(verdict: String, image: ImageStatus) -> Self {
        Self {
            status: InvocationStatus::Success,
            ai_response: Some(verdict),
            reason: None,
            message: None,
            image_attached: (image == ImageStatus::FetchFailed).then_some(false),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Skipped,
            ai_response: None,
            reason: Some(reason.into()),
            message: None,
            image_attached: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Error,
            ai_response: None,
            reason: None,
            message: Some(message.into()),
            image_attached: None,
        }
    }

    /// Compact JSON, one line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize invocation result: {}", e);
            r#"{"status":"error","message":"Failed to serialize result"}"#.to_string()
        })
    }
}
