use thiserror::Error;

/// Errors that abort the decoding of a single IPFIX message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read went past the packet, set or field boundary
    #[error("truncated input at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The message header carries a version other than 10
    #[error("unsupported IPFIX version {0}")]
    UnsupportedVersion(u16),

    /// The message header declares a length shorter than the header itself
    #[error("invalid message length {0}")]
    InvalidMessageLength(u16),

    /// A set header declares a length that cannot hold the header
    #[error("invalid length {length} for set {set_id}")]
    InvalidSetLength { set_id: u16, length: u16 },

    /// An options template declares more scope fields than fields
    #[error(
        "options template {template_id} declares {scope_field_count} scope fields out of {field_count}"
    )]
    ScopeFieldCount {
        template_id: u16,
        scope_field_count: u16,
        field_count: u16,
    },

    /// A basicList contains lists nested past the supported depth
    #[error("basicList nested deeper than {limit} levels")]
    ListTooDeep { limit: usize },
}

/// A specialized Result type for IPFIX decoding
pub type Result<T> = std::result::Result<T, DecodeError>;
