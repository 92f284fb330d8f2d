pub mod ai_provider;
pub mod models;

pub use ai_provider::{GenerativeModel, ModelError};
pub use models::{
    BlockThreshold, ContentPart, HarmCategory, InlineImage, ModelResponse, SafetySettings,
};
