//! Request translation and streaming normalization: OpenAI chat completions
//! in, native Claude-style messages out to the upstream, and the reverse for
//! responses, plus the content sanitation pass the inbound handler runs
//! before translating or forwarding a request body.

pub mod generate;
pub mod sanitize;
