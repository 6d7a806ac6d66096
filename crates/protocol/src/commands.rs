//! Vendor command and reply codes
//!
//! The subset of the terminal's command table that the attendance workflow
//! uses: session management, device enable/disable, the buffered-read
//! transfer commands, and the two record operations (attendance log read,
//! user delete).

/// Open a session; the reply carries the device-assigned session id.
pub const CMD_CONNECT: u16 = 1000;
/// Close the session.
pub const CMD_EXIT: u16 = 1001;
/// Resume accepting attendance punches.
pub const CMD_ENABLEDEVICE: u16 = 1002;
/// Stop accepting attendance punches while the log is read or mutated.
pub const CMD_DISABLEDEVICE: u16 = 1003;

/// Authenticate with the commkey derived from the device credential.
pub const CMD_AUTH: u16 = 1102;

/// Read the attendance log (issued through the buffered-read envelope).
pub const CMD_ATTLOG_RRQ: u16 = 13;
/// Read the user table (issued through the buffered-read envelope).
pub const CMD_USERTEMP_RRQ: u16 = 9;
/// Delete one user entry by internal uid.
pub const CMD_DELETE_USER: u16 = 18;

/// Announces a data transfer of a given size.
pub const CMD_PREPARE_DATA: u16 = 1500;
/// Carries transfer payload bytes.
pub const CMD_DATA: u16 = 1501;
/// Release the device-side transfer buffer.
pub const CMD_FREE_DATA: u16 = 1502;
/// Stage a read into the device-side buffer.
pub const CMD_PREPARE_BUFFER: u16 = 1503;
/// Read a byte range out of the staged buffer.
pub const CMD_READ_BUFFER: u16 = 1504;

/// Command accepted.
pub const CMD_ACK_OK: u16 = 2000;
/// Command failed on the device.
pub const CMD_ACK_ERROR: u16 = 2001;
/// Command accepted, payload follows inline.
pub const CMD_ACK_DATA: u16 = 2002;
/// Session requires authentication before this command is accepted.
pub const CMD_ACK_UNAUTH: u16 = 2005;

/// Sub-target selector for [`CMD_USERTEMP_RRQ`] buffered reads.
pub const FCT_USER: u8 = 5;
