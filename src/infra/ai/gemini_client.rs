// =============================================================================
// GEMINI CLIENT - Google AI Studio generateContent
// =============================================================================
//
// Implements `GenerativeModel` against the Gemini REST API
// (https://ai.google.dev/api/generate-content).
//
// **Wire format notes:**
// - Authentication: API key goes in the `x-goog-api-key` header, not the query
//   string, so it never shows up in a logged request URL.
// - Request: a single user turn in `contents[]`, its `parts` holding the prompt
//   and at most one base64 image in `inlineData`.
// - Safety: our `SafetySettings` mapping becomes the `safetySettings` list of
//   `{category, threshold}` objects.
// - Response: text is spread over `candidates[0].content.parts[*].text`. A
//   blocked prompt comes back with no candidates and a `promptFeedback.blockReason`.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model name, e.g. `gemini-2.5-flash`

use crate::core::ai::{
    BlockThreshold, ContentPart, GenerativeModel, HarmCategory, ModelError, ModelResponse,
    SafetySettings,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

/// A single part of content. Exactly one field is set per part.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Base64 image bytes sent with the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,

    /// Set on thinking parts by 2.5+ models; those are not part of the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// "user" on the way in, "model" on the way out.
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Missing when the candidate itself was filtered.
    #[serde(default)]
    content: Option<Content>,

    /// Why the model stopped generating (e.g., "STOP", "SAFETY").
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for Google's Gemini `generateContent` endpoint.
///
/// # Example
/// ```ignore
/// let client = GeminiClient::new(Client::new(), api_key, "gemini-2.5-flash".to_string());
/// let response = client
///     .generate_content(&[ContentPart::Text("Hello".into())], &SafetySettings::permissive())
///     .await?;
/// ```
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn convert_part(part: &ContentPart) -> Part {
        match part {
            ContentPart::Text(text) => Part {
                text: Some(text.clone()),
                ..Default::default()
            },
            ContentPart::InlineImage(image) => Part {
                inline_data: Some(Blob {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
                ..Default::default()
            },
        }
    }

    fn category_name(category: HarmCategory) -> &'static str {
        match category {
            HarmCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
            HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
            HarmCategory::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            HarmCategory::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }

    fn threshold_name(threshold: BlockThreshold) -> &'static str {
        match threshold {
            BlockThreshold::BlockNone => "BLOCK_NONE",
        }
    }

    fn convert_safety(safety: &SafetySettings) -> Vec<GeminiSafetySetting> {
        safety
            .iter()
            .map(|(category, threshold)| GeminiSafetySetting {
                category: Self::category_name(category),
                threshold: Self::threshold_name(threshold),
            })
            .collect()
    }

    fn build_request(parts: &[ContentPart], safety: &SafetySettings) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: parts.iter().map(Self::convert_part).collect(),
            }],
            safety_settings: Self::convert_safety(safety),
        }
    }

    /// Joins the answer text of the first candidate, skipping thinking parts.
    fn convert_response(response: GenerateContentResponse) -> ModelResponse {
        let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
            return ModelResponse {
                text: None,
                finish_reason: None,
                block_reason,
            };
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text)
            .collect();

        ModelResponse {
            text: (!text.is_empty()).then_some(text),
            finish_reason: candidate.finish_reason,
            block_reason,
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(
        &self,
        parts: &[ContentPart],
        safety: &SafetySettings,
    ) -> Result<ModelResponse, ModelError> {
        let request = Self::build_request(parts, safety);

        tracing::debug!(
            "Gemini request to model {}: {} parts, image attached: {}",
            self.model,
            parts.len(),
            parts.iter().any(ContentPart::is_image)
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| ModelError::Transport(e.to_string()))?;

            // Prefer Gemini's own error message when the body has one.
            let message = serde_json::from_str::<GeminiErrorResponse>(&error_text)
                .map(|r| r.error.message)
                .unwrap_or(error_text);

            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_json: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        let converted = Self::convert_response(response_json);

        tracing::debug!(
            "Gemini response received: {} chars, finish reason {:?}, block reason {:?}",
            converted.text().map(str::len).unwrap_or(0),
            converted.finish_reason,
            converted.block_reason
        );

        Ok(converted)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::InlineImage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> ContentPart {
        ContentPart::Text("Is this suitable?".to_string())
    }

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            "test-key".to_string(),
            "gemini-test".to_string(),
        )
        .with_base_url(server.uri())
    }

    #[test]
    fn test_request_serializes_camel_case_with_inline_image() {
        let parts = vec![
            prompt(),
            ContentPart::InlineImage(InlineImage {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            }),
        ];

        let request = GeminiClient::build_request(&parts, &SafetySettings::permissive());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value["contents"][0],
            json!({
                "role": "user",
                "parts": [
                    { "text": "Is this suitable?" },
                    { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                ]
            })
        );
    }

    #[test]
    fn test_permissive_safety_becomes_four_block_none_entries() {
        let request = GeminiClient::build_request(&[prompt()], &SafetySettings::permissive());
        let value = serde_json::to_value(&request).unwrap();

        let settings = value["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
        for category in [
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ] {
            assert!(settings.iter().any(|s| s["category"] == category));
        }
    }

    #[test]
    fn test_response_joins_text_parts_and_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "Not suitable. " },
                        { "text": "It advertises pets for sale." }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let converted = GeminiClient::convert_response(response);

        assert_eq!(
            converted.text(),
            Some("Not suitable. It advertises pets for sale.")
        );
        assert_eq!(converted.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_blocked_prompt_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "OTHER" }
        }))
        .unwrap();

        let converted = GeminiClient::convert_response(response);

        assert_eq!(converted.text(), None);
        assert_eq!(converted.block_reason.as_deref(), Some("OTHER"));
    }

    #[test]
    fn test_filtered_candidate_without_content_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        let converted = GeminiClient::convert_response(response);

        assert_eq!(converted.text(), None);
        assert_eq!(converted.finish_reason.as_deref(), Some("SAFETY"));
    }

    #[tokio::test]
    async fn test_generate_content_posts_to_model_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Is this suitable?" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Suitable." }] },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .generate_content(&[prompt()], &SafetySettings::permissive())
            .await
            .unwrap();

        assert_eq!(response.text(), Some("Suitable."));
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_content(&[prompt()], &SafetySettings::permissive())
            .await
            .unwrap_err();

        match err {
            ModelError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbled_success_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_content(&[prompt()], &SafetySettings::permissive())
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::Decode(_)));
    }
}
