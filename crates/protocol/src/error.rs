//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame did not start with the vendor magic bytes
    #[error("Bad frame magic: {0:02X?}")]
    BadMagic([u8; 4]),

    /// Frame length exceeds maximum allowed size
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame or packet shorter than its declared/minimum length
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// Packet checksum did not match the transmitted value
    #[error("Checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    ChecksumMismatch { computed: u16, received: u16 },

    /// Device answered with an unexpected reply code
    #[error("Unexpected reply {reply:#06x} to command {command:#06x}")]
    UnexpectedReply { command: u16, reply: u16 },

    /// Device reported failure for the issued command
    #[error("Device rejected command {command:#06x}")]
    CommandRejected { command: u16 },

    /// Record payload is not a whole number of entries
    #[error("Malformed record payload: {len} bytes is not a multiple of {entry}")]
    MalformedRecords { len: usize, entry: usize },

    /// Packed device timestamp does not decode to a calendar date
    #[error("Invalid device timestamp: {0:#010x}")]
    InvalidTimestamp(u32),

    /// I/O error during frame operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::ChecksumMismatch {
            computed: 0x1234,
            received: 0x4321,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Checksum mismatch"));
        assert!(msg.contains("0x1234"));
        assert!(msg.contains("0x4321"));
    }

    #[test]
    fn test_frame_too_large_error() {
        let err = ProtocolError::FrameTooLarge {
            size: 10_000_000,
            max: 1_000_000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Frame too large"));
    }
}
