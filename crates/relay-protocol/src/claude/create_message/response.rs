use crate::claude::create_message::types::BetaMessage;

/// `POST /v1/messages` response body: a single non-streaming message.
pub type CreateMessageResponse = BetaMessage;
