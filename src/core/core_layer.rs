// The core module contains the moderation workflow and the ports it talks to.
// Nothing in here knows about HTTP, Gemini or Appwrite.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "documents/document_store.rs"]
pub mod documents;

#[path = "intake/event_intake.rs"]
pub mod intake;

#[path = "moderation/mod.rs"]
pub mod moderation;
