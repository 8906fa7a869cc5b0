//! STUN error types.

use thiserror::Error;

/// STUN errors
#[derive(Debug, Error)]
pub enum StunError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Query timeout
    #[error("STUN query timeout")]
    Timeout,

    /// Message shorter than its header or declared length
    #[error("STUN message too short")]
    MessageTooShort,

    /// Invalid magic cookie
    #[error("invalid STUN magic cookie")]
    InvalidMagicCookie,

    /// Message type is not a Binding message of the expected class
    #[error("invalid STUN message type: {0:#06x}")]
    InvalidMessageType(u16),

    /// Attribute value is malformed
    #[error("invalid STUN attribute")]
    InvalidAttribute,

    /// Address family other than IPv4 or IPv6
    #[error("unsupported address family: {0:#04x}")]
    UnsupportedFamily(u8),

    /// Transaction ID mismatch
    #[error("transaction ID mismatch")]
    TransactionMismatch,

    /// Missing XOR-MAPPED-ADDRESS attribute
    #[error("missing XOR-MAPPED-ADDRESS attribute")]
    MissingAttribute,
}
