//! Signaling error types.

use thiserror::Error;

/// Control message encoding/decoding errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound text is not a recognized control message
    #[error("malformed control message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Outbound message could not be serialized
    #[error("failed to encode relay message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Signaling server errors
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Network I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The relay task is no longer accepting events
    #[error("relay task stopped")]
    RelayClosed,
}
