//! The provider's native message format: `POST /v1/messages` and
//! `POST /v1/messages/count_tokens`, pass-through endpoints on the client
//! surface.

pub mod count_tokens;
pub mod create_message;
pub mod error;
pub mod types;
