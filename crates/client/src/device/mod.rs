//! Device subsystem
//!
//! Self-contained sessions against the attendance terminal: every public
//! operation connects, does its work with polling disabled, re-enables
//! polling, and disconnects, even when the work in the middle fails.

pub mod session;

pub use session::{DeviceSession, delete_user, fetch_attendance};
