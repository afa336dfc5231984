//! Chat-completions <-> native message translation for the single pipeline
//! this proxy needs: an OpenAI-shaped client talking to a Claude-shaped
//! upstream.

pub mod request;
pub mod response;
pub mod stream;

pub use request::transform_request;
pub use response::transform_response;
pub use stream::{ClaudeToOpenAIChatCompletionStreamEvent, ClaudeToOpenAIChatCompletionStreamState};
