// Process-wide configuration, read once at startup.
//
// **Environment Variables:**
// - `APPWRITE_PROJECT_ID` / `APPWRITE_API_KEY` - server credentials (required)
// - `GEMINI_API_KEY` - Gemini API key (required)
// - `APPWRITE_ENDPOINT` - defaults to Appwrite Cloud
// - `GEMINI_MODEL` - defaults to `gemini-2.5-flash`
// - `GEMINI_BASE_URL` - defaults to the public Gemini API host
// - `HTTP_TIMEOUT_SECS` - per-request timeout; unset means the client default

use crate::infra::ai::gemini_client::DEFAULT_BASE_URL as GEMINI_DEFAULT_BASE_URL;
use crate::infra::appwrite::appwrite_client::DEFAULT_ENDPOINT as APPWRITE_DEFAULT_ENDPOINT;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub appwrite_endpoint: String,
    pub appwrite_project_id: String,
    pub appwrite_api_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub http_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "HTTP_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            appwrite_endpoint: get("APPWRITE_ENDPOINT")
                .unwrap_or_else(|| APPWRITE_DEFAULT_ENDPOINT.to_string()),
            appwrite_project_id: require("APPWRITE_PROJECT_ID")?,
            appwrite_api_key: require("APPWRITE_API_KEY")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| GEMINI_DEFAULT_BASE_URL.to_string()),
            http_timeout,
        })
    }
}

// Keys stay out of the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("appwrite_endpoint", &self.appwrite_endpoint)
            .field("appwrite_project_id", &self.appwrite_project_id)
            .field("appwrite_api_key", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}
