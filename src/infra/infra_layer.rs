// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "appwrite/mod.rs"]
pub mod appwrite;

#[path = "images/mod.rs"]
pub mod images;
