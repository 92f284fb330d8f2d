// Core moderation module - builds the request, asks the model, records the verdict.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
