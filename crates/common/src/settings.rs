//! Runtime settings for scanning and device sessions
//!
//! Everything the original tool hard-coded (port, credential, timeouts,
//! probe cap) flows through these structs instead, so tests can point the
//! scanner and session at mock endpoints with tight timeouts.

use std::time::Duration;

/// Vendor protocol port.
pub const DEFAULT_PORT: u16 = 4370;

/// Per-probe connect timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-request session timeout.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Concurrent probe cap. Unbounded fan-out against a /24 can exhaust
/// ephemeral sockets and file descriptors.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;

/// Subnet scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Port probed on every candidate.
    pub port: u16,
    /// How long a single probe may take before it counts as closed.
    pub probe_timeout: Duration,
    /// Upper bound on probes in flight at once.
    pub max_in_flight: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Device session parameters. The credential has no default: it is
/// required configuration, not a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Device protocol port.
    pub port: u16,
    /// Communication password the device was provisioned with.
    pub password: u32,
    /// Bound on every request/response exchange in a session.
    pub timeout: Duration,
}

impl SessionSettings {
    pub fn new(password: u32) -> Self {
        Self {
            port: DEFAULT_PORT,
            password,
            timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}
