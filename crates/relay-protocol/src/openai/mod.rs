//! OpenAI-compatible wire types for the client-facing chat endpoint.

pub mod create_chat_completions;
pub mod list_models;
pub mod types;
