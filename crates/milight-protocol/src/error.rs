//! Error types for MiLight packet parsing and remote lookup

use thiserror::Error;

/// Errors that can occur while parsing a raw packet
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer length does not match the protocol's fixed packet length
    #[error("invalid packet length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Protocol-identifying byte did not match
    #[error("unexpected protocol id: 0x{0:02X}")]
    UnexpectedProtocolId(u8),

    /// Hex text could not be decoded into bytes
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Higher-level protocol errors surfaced at API boundaries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Remote type name not recognized
    #[error("unknown remote type: {0}")]
    UnknownRemote(String),

    /// Command name not recognized
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Status value not recognized
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// No known protocol claims the packet
    #[error("no remote type recognizes packet of {0} bytes")]
    UnrecognizedPacket(usize),
}
