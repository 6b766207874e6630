//! Error types for the gateway

use milight_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by a radio driver
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// No radio was created for this configuration index
    #[error("no radio for configuration {0}")]
    NotFound(usize),

    /// Read, write or configure called before `begin`
    #[error("radio {0} has not been started")]
    NotStarted(usize),

    /// Frame does not fit the radio's configured packet length
    #[error("frame of {actual} bytes exceeds packet length {max}")]
    FrameTooLong { max: usize, actual: usize },

    /// Hardware or transport failure reported by the driver
    #[error("radio I/O failed: {0}")]
    Io(String),
}

/// Errors surfaced by the gateway client
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A setter was called before `prepare`
    #[error("no remote prepared; call prepare() first")]
    NotPrepared,

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Radio error
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),
}
