//! Error types for the evaluator channel.

use std::time::Duration;

use mungo_protocol::{Fault, Identifier, ProtocolError};
use thiserror::Error;

/// Errors raised while talking to the evaluator.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// An envelope could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transport refused the outbound envelope.
    #[error("transport error: {0}")]
    Transport(String),

    /// The evaluator went away before answering.
    #[error("evaluator channel closed")]
    ChannelClosed,

    /// No response arrived in time.
    #[error("request {request_id} timed out after {timeout:?}")]
    Timeout {
        request_id: Identifier,
        timeout: Duration,
    },

    /// The evaluator answered with `success: false`.
    #[error("evaluator rejected request: {0}")]
    Rejected(Fault),

    /// The evaluator answered with content of the wrong shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for messenger operations.
pub type Result<T> = std::result::Result<T, MessengerError>;
