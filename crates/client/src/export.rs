//! Attendance export sink
//!
//! Writes fetched records as a pretty-printed JSON array in device order.
//! Ambiguously-typed fields (the timestamp, the opaque vendor tail) render
//! as strings; see the serializers on [`AttendanceRecord`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use common::{Error, Result};
use protocol::AttendanceRecord;
use tracing::info;

/// Serialize `records` to `path`, overwriting any previous export.
pub fn write_attendance_json(records: &[AttendanceRecord], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    writer.flush()?;

    info!(count = records.len(), path = %path.display(), "attendance log exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::sample_records;

    #[test]
    fn export_writes_one_object_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_logs.json");
        let records = sample_records(&["1001", "1002", "1003"]);

        write_attendance_json(&records, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["user_id"], "1001");
        // Timestamp is exported as a plain string, not a JSON datetime.
        assert_eq!(entries[0]["timestamp"], "2025-06-02 08:00:00");
        assert!(entries[0]["reserved"].is_string());
    }

    #[test]
    fn export_of_empty_fetch_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");

        write_attendance_json(&[], &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[test]
    fn unwritable_destination_is_an_io_error() {
        let result = write_attendance_json(&[], Path::new("/nonexistent-dir/out.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
