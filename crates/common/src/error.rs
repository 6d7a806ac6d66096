//! Common error types
//!
//! The error taxonomy the front end keys its notifications on. "No device
//! found in range" is deliberately NOT here: the scanner reports it as a
//! normal `None`, not a failure.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Address range could not be parsed or is inconsistent.
    #[error("Invalid address range: {0}")]
    InvalidRange(String),

    /// Device unreachable, refused, or rejected the credential before a
    /// usable session existed.
    #[error("Cannot connect to device at {addr}: {reason}")]
    Connect { addr: SocketAddr, reason: String },

    /// Mid-session failure after the connection was established. The
    /// session has already re-enabled the device by the time this
    /// surfaces.
    #[error("Device protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    /// Delete target not present on the device.
    #[error("No user with id {0:?} on the device")]
    UserNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error outside a device session (export sink, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
