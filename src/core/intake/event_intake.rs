// Event intake - turns the raw document-created event into a moderation job.
//
// Expected shape:
//   { "payload": { "$id", "$collectionId", "$databaseId", "task"?, "text"?, "image_url"? } }
//
// Anything else the database puts in the payload ($createdAt, $permissions, ...)
// is ignored.

use crate::core::documents::DocumentRef;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Everything the moderation step needs, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationJob {
    pub document: DocumentRef,
    pub task: String,
    pub text: String,
    /// `None` when the field was absent or blank.
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Ready(ModerationJob),
    /// Valid event, but there is nothing to judge the content against.
    Skipped { document_id: String },
}

/// Checks that the raw event bytes are text before any JSON parsing.
pub fn decode_body(body: &[u8]) -> Result<&str, IntakeError> {
    std::str::from_utf8(body)
        .map_err(|e| IntakeError::MalformedPayload(format!("body is not valid UTF-8: {e}")))
}

/// Parses an event body and decides whether it should be moderated.
pub fn parse_event(body: &str) -> Result<IntakeOutcome, IntakeError> {
    let event: Value = serde_json::from_str(body)
        .map_err(|e| IntakeError::MalformedPayload(format!("invalid JSON: {e}")))?;

    if let Ok(pretty) = serde_json::to_string_pretty(&event) {
        tracing::debug!("Event data: {}", pretty);
    }

    let payload = event
        .get("payload")
        .and_then(Value::as_object)
        .ok_or_else(|| IntakeError::MalformedPayload("missing `payload` object".to_string()))?;

    let document = DocumentRef {
        document_id: required_field(payload, "$id")?,
        collection_id: required_field(payload, "$collectionId")?,
        database_id: required_field(payload, "$databaseId")?,
    };

    let task = optional_field(payload, "task");
    let text = optional_field(payload, "text");
    let image_url = optional_field(payload, "image_url");

    if task.is_empty() {
        tracing::info!(
            document_id = %document.document_id,
            "Document has no task description, skipping"
        );
        return Ok(IntakeOutcome::Skipped {
            document_id: document.document_id,
        });
    }

    tracing::info!(
        document_id = %document.document_id,
        task = %task,
        text = %text,
        image_url = %image_url,
        "Received document"
    );

    Ok(IntakeOutcome::Ready(ModerationJob {
        document,
        task,
        text,
        image_url: (!image_url.is_empty()).then_some(image_url),
    }))
}

fn required_field(payload: &Map<String, Value>, key: &str) -> Result<String, IntakeError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IntakeError::MalformedPayload(format!("missing required field `{key}`")))
}

/// Absent, null and non-string values all read as "".
fn optional_field(payload: &Map<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(payload: Value) -> String {
        json!({ "payload": payload }).to_string()
    }

    #[test]
    fn test_full_payload_is_ready() {
        let body = event(json!({
            "$id": "d1",
            "$collectionId": "c1",
            "$databaseId": "db1",
            "task": "  moderate flyer ",
            "text": "Free puppies, ask inside\n",
            "image_url": " https://cdn.example.com/flyer.png ",
            "$createdAt": "2024-01-01T00:00:00.000+00:00"
        }));

        let outcome = parse_event(&body).unwrap();

        assert_eq!(
            outcome,
            IntakeOutcome::Ready(ModerationJob {
                document: DocumentRef {
                    database_id: "db1".to_string(),
                    collection_id: "c1".to_string(),
                    document_id: "d1".to_string(),
                },
                task: "moderate flyer".to_string(),
                text: "Free puppies, ask inside".to_string(),
                image_url: Some("https://cdn.example.com/flyer.png".to_string()),
            })
        );
    }

    #[test]
    fn test_blank_image_url_is_none() {
        let body = event(json!({
            "$id": "d1", "$collectionId": "c1", "$databaseId": "db1",
            "task": "moderate flyer", "image_url": "   "
        }));

        match parse_event(&body).unwrap() {
            IntakeOutcome::Ready(job) => {
                assert_eq!(job.image_url, None);
                assert_eq!(job.text, "");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_task_is_skipped() {
        let body = event(json!({
            "$id": "d1", "$collectionId": "c1", "$databaseId": "db1",
            "task": "   ", "text": "something"
        }));

        assert_eq!(
            parse_event(&body).unwrap(),
            IntakeOutcome::Skipped {
                document_id: "d1".to_string()
            }
        );
    }

    #[test]
    fn test_missing_and_null_task_are_skipped() {
        for payload in [
            json!({ "$id": "d1", "$collectionId": "c1", "$databaseId": "db1" }),
            json!({ "$id": "d1", "$collectionId": "c1", "$databaseId": "db1", "task": null }),
        ] {
            assert!(matches!(
                parse_event(&event(payload)).unwrap(),
                IntakeOutcome::Skipped { .. }
            ));
        }
    }

    #[test]
    fn test_missing_identity_fields_are_malformed() {
        for missing in ["$id", "$collectionId", "$databaseId"] {
            let mut payload = json!({
                "$id": "d1", "$collectionId": "c1", "$databaseId": "db1",
                "task": "moderate flyer"
            });
            payload.as_object_mut().unwrap().remove(missing);

            let err = parse_event(&event(payload)).unwrap_err();
            assert_eq!(
                err,
                IntakeError::MalformedPayload(format!("missing required field `{missing}`"))
            );
        }
    }

    #[test]
    fn test_empty_identity_is_malformed() {
        let body = event(json!({
            "$id": "", "$collectionId": "c1", "$databaseId": "db1", "task": "t"
        }));

        assert!(parse_event(&body).is_err());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_event("{not json").unwrap_err();
        let IntakeError::MalformedPayload(message) = err;
        assert!(message.starts_with("invalid JSON"));
    }

    #[test]
    fn test_invalid_utf8_body_is_malformed() {
        let err = decode_body(b"{\"payload\":{\"task\":\"t\xff\"}}").unwrap_err();
        let IntakeError::MalformedPayload(message) = err;
        assert!(message.starts_with("body is not valid UTF-8"));

        assert_eq!(decode_body(b"{}"), Ok("{}"));
    }

    #[test]
    fn test_missing_payload_object_is_malformed() {
        assert!(parse_event(r#"{"$id": "d1"}"#).is_err());
        assert!(parse_event(r#"{"payload": "d1"}"#).is_err());
    }
}
