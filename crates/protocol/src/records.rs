//! Attendance log and user table codec
//!
//! Buffered reads return the attendance log as 40-byte entries and the user
//! table as 72-byte entries, each optionally preceded by a u32 total-size
//! word. Both directions are implemented: parsing feeds the fetch workflow,
//! encoding feeds the mock device and the round-trip tests. Vendor fields
//! with no meaning to this tool (the entry tails) are carried opaquely so
//! nothing the device reports is dropped on export.

use bytes::{Buf, BufMut};
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::datetime::{decode_timestamp, encode_timestamp};
use crate::error::{ProtocolError, Result};

/// Attendance log entry size on the wire.
pub const ATT_ENTRY_SIZE: usize = 40;

/// User table entry size on the wire.
pub const USER_ENTRY_SIZE: usize = 72;

/// One attendance punch, in device-reported order.
///
/// `uid` is the device's internal record slot and `reserved` the opaque
/// vendor tail; both are preserved verbatim so an export is faithful to
/// what the terminal holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub uid: u16,
    pub user_id: String,
    #[serde(serialize_with = "timestamp_as_string")]
    pub timestamp: NaiveDateTime,
    pub verify_method: u8,
    pub punch: u8,
    #[serde(serialize_with = "bytes_as_hex")]
    pub reserved: [u8; 8],
}

/// One user table entry.
///
/// Read only to resolve a user id string to the internal uid that the
/// delete command is keyed by; the remaining fields ride along unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: u16,
    pub privilege: u8,
    pub password: String,
    pub name: String,
    pub card: u32,
    pub group: u8,
    pub reserved: [u8; 7],
    pub user_id: String,
}

/// Parse an attendance log payload into records, device order preserved.
pub fn parse_attendance_log(data: &[u8]) -> Result<Vec<AttendanceRecord>> {
    let body = strip_size_prefix(data);
    if body.len() % ATT_ENTRY_SIZE != 0 {
        return Err(ProtocolError::MalformedRecords {
            len: body.len(),
            entry: ATT_ENTRY_SIZE,
        });
    }

    let mut records = Vec::with_capacity(body.len() / ATT_ENTRY_SIZE);
    for entry in body.chunks_exact(ATT_ENTRY_SIZE) {
        let mut cursor = entry;
        let uid = cursor.get_u16_le();
        let user_id = read_str(&cursor[..24]);
        cursor.advance(24);
        let verify_method = cursor.get_u8();
        let timestamp = decode_timestamp(cursor.get_u32_le())?;
        let punch = cursor.get_u8();
        let mut reserved = [0u8; 8];
        cursor.copy_to_slice(&mut reserved);

        records.push(AttendanceRecord {
            uid,
            user_id,
            timestamp,
            verify_method,
            punch,
            reserved,
        });
    }
    Ok(records)
}

/// Encode records back into a size-prefixed attendance payload.
pub fn encode_attendance_log(records: &[AttendanceRecord]) -> Vec<u8> {
    let body_len = records.len() * ATT_ENTRY_SIZE;
    let mut buf = Vec::with_capacity(4 + body_len);
    buf.put_u32_le(body_len as u32);

    for record in records {
        buf.put_u16_le(record.uid);
        write_str(&mut buf, &record.user_id, 24);
        buf.put_u8(record.verify_method);
        buf.put_u32_le(encode_timestamp(&record.timestamp));
        buf.put_u8(record.punch);
        buf.put_slice(&record.reserved);
    }
    buf
}

/// Parse a user table payload.
pub fn parse_user_table(data: &[u8]) -> Result<Vec<UserRecord>> {
    let body = strip_size_prefix(data);
    if body.len() % USER_ENTRY_SIZE != 0 {
        return Err(ProtocolError::MalformedRecords {
            len: body.len(),
            entry: USER_ENTRY_SIZE,
        });
    }

    let mut users = Vec::with_capacity(body.len() / USER_ENTRY_SIZE);
    for entry in body.chunks_exact(USER_ENTRY_SIZE) {
        let mut cursor = entry;
        let uid = cursor.get_u16_le();
        let privilege = cursor.get_u8();
        let password = read_str(&cursor[..8]);
        cursor.advance(8);
        let name = read_str(&cursor[..24]);
        cursor.advance(24);
        let card = cursor.get_u32_le();
        let group = cursor.get_u8();
        let mut reserved = [0u8; 7];
        cursor.copy_to_slice(&mut reserved);
        cursor.advance(1); // pad byte
        let user_id = read_str(&cursor[..24]);

        users.push(UserRecord {
            uid,
            privilege,
            password,
            name,
            card,
            group,
            reserved,
            user_id,
        });
    }
    Ok(users)
}

/// Encode users back into a size-prefixed user table payload.
pub fn encode_user_table(users: &[UserRecord]) -> Vec<u8> {
    let body_len = users.len() * USER_ENTRY_SIZE;
    let mut buf = Vec::with_capacity(4 + body_len);
    buf.put_u32_le(body_len as u32);

    for user in users {
        buf.put_u16_le(user.uid);
        buf.put_u8(user.privilege);
        write_str(&mut buf, &user.password, 8);
        write_str(&mut buf, &user.name, 24);
        buf.put_u32_le(user.card);
        buf.put_u8(user.group);
        buf.put_slice(&user.reserved);
        buf.put_u8(0); // pad byte
        write_str(&mut buf, &user.user_id, 24);
    }
    buf
}

/// Firmware prefixes buffered payloads with a u32 byte count; accept both
/// the prefixed and the bare form.
fn strip_size_prefix(data: &[u8]) -> &[u8] {
    if data.len() >= 4 {
        let declared = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if declared == data.len() - 4 {
            return &data[4..];
        }
    }
    data
}

fn read_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim().to_string()
}

fn write_str(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

fn timestamp_as_string<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format("%Y-%m-%d %H:%M:%S"))
}

fn bytes_as_hex<S: Serializer>(
    bytes: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    serializer.serialize_str(&out)
}
