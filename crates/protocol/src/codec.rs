//! TCP framing for command packets
//!
//! Over TCP the terminal wraps every packet in a fixed envelope:
//!
//! ```text
//! [magic: 50 50 82 7D][payload length: u32 LE][packet bytes]
//! ```
//!
//! where the length counts the packet bytes only. Frames above
//! [`MAX_PAYLOAD_SIZE`] are rejected to bound memory use; the attendance
//! log of even a large terminal is far below it.

use crate::error::{ProtocolError, Result};
use crate::packet::{PACKET_HEADER_SIZE, Packet};

#[cfg(feature = "async")]
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Leading magic of every TCP frame.
pub const FRAME_MAGIC: [u8; 4] = [0x50, 0x50, 0x82, 0x7D];

/// Frame envelope length: magic plus the u32 payload length.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Maximum accepted frame payload (1 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Encode a packet into a complete TCP frame.
///
/// # Example
/// ```
/// use protocol::{Packet, encode_frame, decode_frame, CMD_CONNECT};
///
/// let packet = Packet::new(CMD_CONNECT, 0, 0, Vec::new());
/// let frame = encode_frame(&packet);
/// assert_eq!(decode_frame(&frame).unwrap(), packet);
/// ```
pub fn encode_frame(packet: &Packet) -> Vec<u8> {
    let body = packet.encode();
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Decode a complete in-memory frame back into a packet.
pub fn decode_frame(frame: &[u8]) -> Result<Packet> {
    if frame.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::IncompleteFrame {
            expected: FRAME_HEADER_SIZE,
            actual: frame.len(),
        });
    }

    let magic = [frame[0], frame[1], frame[2], frame[3]];
    if magic != FRAME_MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }

    let length = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]) as usize;
    if length > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    if length < PACKET_HEADER_SIZE || frame.len() < FRAME_HEADER_SIZE + length {
        return Err(ProtocolError::IncompleteFrame {
            expected: FRAME_HEADER_SIZE + length.max(PACKET_HEADER_SIZE),
            actual: frame.len(),
        });
    }

    Packet::parse(&frame[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + length])
}

/// Async: write one framed packet to a stream.
#[cfg(feature = "async")]
pub async fn write_frame<W>(writer: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&encode_frame(packet)).await?;
    Ok(())
}

/// Async: read one framed packet from a stream.
#[cfg(feature = "async")]
pub async fn read_frame<R>(reader: &mut R) -> Result<Packet>
where
    R: AsyncReadExt + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let magic = [header[0], header[1], header[2], header[3]];
    if magic != FRAME_MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }

    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if length > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Packet::parse(&body)
}
