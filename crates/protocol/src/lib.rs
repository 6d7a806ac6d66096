//! Wire protocol for ZKTeco-compatible attendance terminals
//!
//! This crate implements the subset of the terminal's TCP binary protocol
//! needed to pull the attendance log and delete user entries: command
//! packets with the vendor checksum, the magic-prefixed TCP framing,
//! commkey authentication, and the codecs for attendance and user records.
//! It performs no I/O of its own apart from the optional async frame
//! helpers (`async` feature, on by default).
//!
//! # Example
//!
//! ```
//! use protocol::{Packet, CMD_CONNECT, encode_frame, decode_frame};
//!
//! // First packet of every session: connect, no session id yet.
//! let connect = Packet::new(CMD_CONNECT, 0, 0, Vec::new());
//! let frame = encode_frame(&connect);
//! assert_eq!(decode_frame(&frame).unwrap(), connect);
//! ```

pub mod auth;
pub mod codec;
pub mod commands;
pub mod datetime;
pub mod error;
pub mod packet;
pub mod records;

pub use auth::commkey;
pub use codec::{
    FRAME_HEADER_SIZE, FRAME_MAGIC, MAX_PAYLOAD_SIZE, decode_frame, encode_frame,
};
#[cfg(feature = "async")]
pub use codec::{read_frame, write_frame};
pub use commands::{
    CMD_ACK_DATA, CMD_ACK_ERROR, CMD_ACK_OK, CMD_ACK_UNAUTH, CMD_ATTLOG_RRQ, CMD_AUTH,
    CMD_CONNECT, CMD_DATA, CMD_DELETE_USER, CMD_DISABLEDEVICE, CMD_ENABLEDEVICE, CMD_EXIT,
    CMD_FREE_DATA, CMD_PREPARE_BUFFER, CMD_PREPARE_DATA, CMD_READ_BUFFER, CMD_USERTEMP_RRQ,
    FCT_USER,
};
pub use datetime::{decode_timestamp, encode_timestamp};
pub use error::{ProtocolError, Result};
pub use packet::{PACKET_HEADER_SIZE, Packet, checksum};
pub use records::{
    ATT_ENTRY_SIZE, AttendanceRecord, USER_ENTRY_SIZE, UserRecord, encode_attendance_log,
    encode_user_table, parse_attendance_log, parse_user_table,
};
