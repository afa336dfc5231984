//! The transport-level failure shape: a request that never produced a
//! usable upstream response at all (DNS, TLS, connect, timeout, or an
//! expired credential the caller chose not to refresh).

use relay_common::RelayError;

#[derive(Debug)]
pub enum AttemptError {
    Transport(String),
    AuthExpired,
}

impl From<AttemptError> for RelayError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Transport(msg) => RelayError::UpstreamUnreachable(msg),
            AttemptError::AuthExpired => RelayError::Unauthorized,
        }
    }
}
