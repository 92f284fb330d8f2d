// Fetches linked images over plain HTTP GET and base64-encodes them so the
// model receives the bytes inline instead of having to dereference the URL.

use crate::core::ai::InlineImage;
use crate::core::moderation::{ImageFetchError, ImageFetcher};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// MIME type used when neither the server nor the URL tells us.
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Prefers the server's `Content-Type` when it names an image type.
    fn resolve_mime_type(content_type: Option<&str>, url: &str) -> String {
        content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or_else(|| guess_mime_type(url).to_string())
    }
}

/// Best-effort MIME type from the URL's file extension.
pub fn guess_mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => DEFAULT_IMAGE_MIME,
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<InlineImage, ImageFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageFetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImageFetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageFetchError::Transport(e.to_string()))?;

        if bytes.is_empty() {
            return Err(ImageFetchError::Empty);
        }

        let mime_type = Self::resolve_mime_type(content_type.as_deref(), url);
        tracing::debug!("Fetched {} bytes of {} from {}", bytes.len(), mime_type, url);

        Ok(InlineImage {
            mime_type,
            data: STANDARD.encode(&bytes),
        })
    }
}
