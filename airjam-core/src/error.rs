//! Error types for airjam

use crate::MacAddr;
use thiserror::Error;

/// Result type alias for airjam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for airjam
#[derive(Error, Debug)]
pub enum Error {
    /// Radio / socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Unparseable hardware address
    #[error("Invalid MAC address '{0}'")]
    InvalidMac(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Frame construction error
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),

    /// Named deauth target resolved to nothing
    #[error("{0} is an unknown BSSID, is in the deauth skip list, or doesn't have detected clients")]
    UnknownTarget(MacAddr),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a frame construction error
    pub fn construction<S: Into<String>>(msg: S) -> Self {
        Error::PacketConstruction(msg.into())
    }

    /// Is this the radio telling us its transmit buffer is momentarily full?
    ///
    /// Raw sockets report this as `EAGAIN` ("Resource temporarily
    /// unavailable"), which std maps to [`std::io::ErrorKind::WouldBlock`].
    pub fn is_backpressure(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::WouldBlock,
            _ => false,
        }
    }
}
