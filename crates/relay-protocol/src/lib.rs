//! Wire types shared by the client-facing HTTP surface: the OpenAI
//! chat-completions request/response/stream shapes, the provider's native
//! message format, and the SSE line parser both speak through.

pub mod claude;
pub mod openai;
pub mod sse;
