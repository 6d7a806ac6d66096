//! zk-attendance client library
//!
//! The pieces behind the `zk-attendance` binary: the bounded-concurrency
//! subnet scanner that locates the terminal, the self-contained device
//! sessions that read the attendance log or delete a user record, the JSON
//! export sink, and the TOML configuration layer. The binary itself is a
//! thin presentation shell over these modules.

pub mod config;
pub mod device;
pub mod export;
pub mod network;

pub use config::ClientConfig;
pub use device::{delete_user, fetch_attendance};
pub use export::write_attendance_json;
pub use network::Scanner;
