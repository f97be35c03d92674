//! Error types for the session engine

use thiserror::Error;

/// Errors that can occur while driving a matrix session
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command failed validation; nothing was written
    #[error("command rejected: {0}")]
    Command(#[from] blackbird_protocol::CommandError),

    /// I/O error on the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// The transport reached end of stream
    #[error("transport closed by peer")]
    Disconnected,

    /// The device address has a scheme this crate does not speak
    #[error("unsupported transport scheme: {0:?}")]
    UnsupportedScheme(String),

    /// A partially received line never completed within the read bound
    #[error("timed out after {0}ms waiting for device data")]
    Timeout(u64),
}
