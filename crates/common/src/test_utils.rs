//! Test utilities
//!
//! A scripted terminal that speaks the wire protocol over a real TCP
//! listener, for tests across crates: canned user and attendance data,
//! per-command call recording (so tests can assert the
//! disable → read → enable order), and fault injection for the read path.
//!
//! The mock serves connections sequentially, like the hardware: one
//! session owns the device at a time. Probe connections that open and
//! close without sending a frame are tolerated silently.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use protocol::{
    AttendanceRecord, CMD_ACK_ERROR, CMD_ACK_OK, CMD_ACK_UNAUTH, CMD_ATTLOG_RRQ, CMD_AUTH,
    CMD_CONNECT, CMD_DATA, CMD_DELETE_USER, CMD_DISABLEDEVICE, CMD_ENABLEDEVICE, CMD_EXIT,
    CMD_FREE_DATA, CMD_PREPARE_BUFFER, CMD_PREPARE_DATA, CMD_READ_BUFFER, CMD_USERTEMP_RRQ,
    Packet, UserRecord, commkey, encode_attendance_log, encode_user_table, read_frame,
    write_frame,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

/// Operations the mock observed, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Connect,
    Auth,
    Disable,
    ReadAttendance,
    ReadUsers,
    DeleteUser(u16),
    FreeData,
    Enable,
    Exit,
}

/// Initial contents and behavior of a mock terminal.
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Communication password; 0 means connect without a challenge.
    pub password: u32,
    pub users: Vec<UserRecord>,
    pub records: Vec<AttendanceRecord>,
    /// Make the attendance read fail after polling was disabled.
    pub fail_attendance_read: bool,
    /// Payloads at or above this size go through the staged-buffer chunk
    /// path instead of an inline reply.
    pub inline_limit: usize,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            password: 0,
            users: Vec::new(),
            records: Vec::new(),
            fail_attendance_read: false,
            inline_limit: 1024,
        }
    }
}

struct MockState {
    password: u32,
    users: Vec<UserRecord>,
    records: Vec<AttendanceRecord>,
    fail_attendance_read: bool,
    inline_limit: usize,
    enabled: bool,
    calls: Vec<DeviceCall>,
    staged: Vec<u8>,
}

/// A scripted terminal bound to a loopback address.
pub struct MockDevice {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    /// Bind on 127.0.0.1 with an OS-assigned port.
    pub async fn spawn(config: MockDeviceConfig) -> std::io::Result<Self> {
        Self::bind(Ipv4Addr::LOCALHOST, config).await
    }

    /// Bind on a specific loopback address (anything in 127.0.0.0/8 works
    /// on Linux), so scan tests can place devices at chosen suffixes.
    pub async fn bind(ip: Ipv4Addr, config: MockDeviceConfig) -> std::io::Result<Self> {
        Self::bind_at(SocketAddr::from((ip, 0)), config).await
    }

    /// Bind at an exact address, port included. Used when several mock
    /// devices must share one port across loopback suffixes.
    pub async fn bind_at(addr: SocketAddr, config: MockDeviceConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(MockState {
            password: config.password,
            users: config.users,
            records: config.records,
            fail_attendance_read: config.fail_attendance_read,
            inline_limit: config.inline_limit,
            enabled: true,
            calls: Vec::new(),
            staged: Vec::new(),
        }));

        let serve_state = state.clone();
        tokio::spawn(async move {
            let mut next_session: u16 = 0x55AA;
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    return;
                };
                debug!(%peer, "mock device accepted connection");
                next_session = next_session.wrapping_add(1);
                let _ = serve_connection(stream, serve_state.clone(), next_session).await;
            }
        });

        Ok(Self { addr, state })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ip(&self) -> Ipv4Addr {
        match self.addr.ip() {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(_) => unreachable!("mock binds IPv4 only"),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Everything the device was asked to do so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Whether the terminal is currently accepting punches.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    /// User ids currently on the device.
    pub fn user_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .map(|u| u.user_id.clone())
            .collect()
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<MockState>>,
    session_id: u16,
) -> protocol::Result<()> {
    loop {
        let request = read_frame(&mut stream).await?;
        let closing = request.command == CMD_EXIT;
        let replies = state.lock().unwrap().handle(session_id, &request);
        for reply in &replies {
            write_frame(&mut stream, reply).await?;
        }
        if closing {
            return Ok(());
        }
    }
}

impl MockState {
    /// Process one request into the frames the device would answer with.
    fn handle(&mut self, session_id: u16, request: &Packet) -> Vec<Packet> {
        let ack = |code: u16, payload: Vec<u8>| {
            vec![Packet::new(code, session_id, request.reply_id, payload)]
        };

        match request.command {
            CMD_CONNECT => {
                self.calls.push(DeviceCall::Connect);
                if self.password != 0 {
                    ack(CMD_ACK_UNAUTH, Vec::new())
                } else {
                    ack(CMD_ACK_OK, Vec::new())
                }
            }
            CMD_AUTH => {
                self.calls.push(DeviceCall::Auth);
                if request.payload == commkey(self.password, session_id) {
                    ack(CMD_ACK_OK, Vec::new())
                } else {
                    ack(CMD_ACK_UNAUTH, Vec::new())
                }
            }
            CMD_DISABLEDEVICE => {
                self.calls.push(DeviceCall::Disable);
                self.enabled = false;
                ack(CMD_ACK_OK, Vec::new())
            }
            CMD_ENABLEDEVICE => {
                self.calls.push(DeviceCall::Enable);
                self.enabled = true;
                ack(CMD_ACK_OK, Vec::new())
            }
            CMD_PREPARE_BUFFER => self.handle_prepare_buffer(session_id, request),
            CMD_READ_BUFFER => self.handle_read_buffer(session_id, request),
            CMD_FREE_DATA => {
                self.calls.push(DeviceCall::FreeData);
                self.staged.clear();
                ack(CMD_ACK_OK, Vec::new())
            }
            CMD_DELETE_USER => {
                let Some(uid) = request
                    .payload
                    .get(..2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                else {
                    return ack(CMD_ACK_ERROR, Vec::new());
                };
                self.calls.push(DeviceCall::DeleteUser(uid));
                let before = self.users.len();
                self.users.retain(|u| u.uid != uid);
                if self.users.len() < before {
                    ack(CMD_ACK_OK, Vec::new())
                } else {
                    ack(CMD_ACK_ERROR, Vec::new())
                }
            }
            CMD_EXIT => {
                self.calls.push(DeviceCall::Exit);
                ack(CMD_ACK_OK, Vec::new())
            }
            _ => ack(CMD_ACK_ERROR, Vec::new()),
        }
    }

    fn handle_prepare_buffer(&mut self, session_id: u16, request: &Packet) -> Vec<Packet> {
        let ack = |code: u16, payload: Vec<u8>| {
            vec![Packet::new(code, session_id, request.reply_id, payload)]
        };

        // Payload: [1][inner command u16 LE][fct u32 LE][ext u32 LE]
        let Some(inner) = request
            .payload
            .get(1..3)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
        else {
            return ack(CMD_ACK_ERROR, Vec::new());
        };

        let payload = match inner {
            CMD_ATTLOG_RRQ => {
                self.calls.push(DeviceCall::ReadAttendance);
                if self.fail_attendance_read {
                    return ack(CMD_ACK_ERROR, Vec::new());
                }
                encode_attendance_log(&self.records)
            }
            CMD_USERTEMP_RRQ => {
                self.calls.push(DeviceCall::ReadUsers);
                encode_user_table(&self.users)
            }
            _ => return ack(CMD_ACK_ERROR, Vec::new()),
        };

        if payload.len() < self.inline_limit {
            ack(CMD_DATA, payload)
        } else {
            self.staged = payload;
            let mut info = vec![0u8];
            info.extend_from_slice(&(self.staged.len() as u32).to_le_bytes());
            ack(CMD_ACK_OK, info)
        }
    }

    fn handle_read_buffer(&mut self, session_id: u16, request: &Packet) -> Vec<Packet> {
        let reply = |code: u16, payload: Vec<u8>| {
            Packet::new(code, session_id, request.reply_id, payload)
        };

        let (Some(start), Some(len)) = (
            request
                .payload
                .get(..4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize),
            request
                .payload
                .get(4..8)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize),
        ) else {
            return vec![reply(CMD_ACK_ERROR, Vec::new())];
        };

        let end = (start + len).min(self.staged.len());
        if start > end {
            return vec![reply(CMD_ACK_ERROR, Vec::new())];
        }
        let chunk = self.staged[start..end].to_vec();

        // Real firmware announces the chunk before streaming it.
        let mut announce = Vec::with_capacity(4);
        announce.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        vec![
            reply(CMD_PREPARE_DATA, announce),
            reply(CMD_DATA, chunk),
        ]
    }
}

/// Canned punches in device order, one per minute starting 08:00.
pub fn sample_records(user_ids: &[&str]) -> Vec<AttendanceRecord> {
    use chrono::NaiveDate;

    user_ids
        .iter()
        .enumerate()
        .map(|(i, id)| AttendanceRecord {
            uid: i as u16 + 1,
            user_id: (*id).to_string(),
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(8, i as u32 % 60, 0)
                .unwrap(),
            verify_method: 1,
            punch: 0,
            reserved: [0; 8],
        })
        .collect()
}

/// Users shaped like a freshly provisioned terminal, for tests.
pub fn sample_users(user_ids: &[&str]) -> Vec<UserRecord> {
    user_ids
        .iter()
        .enumerate()
        .map(|(i, id)| UserRecord {
            uid: i as u16 + 1,
            privilege: 0,
            password: String::new(),
            name: format!("Employee {}", i + 1),
            card: 0,
            group: 1,
            reserved: [0; 7],
            user_id: (*id).to_string(),
        })
        .collect()
}
