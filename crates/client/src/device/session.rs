//! Terminal session management
//!
//! One [`DeviceSession`] is one connect → operate → disconnect sequence;
//! nothing persists between the public operations, so a failed call can
//! never leak device state into the next one. The critical contract lives
//! in [`fetch_attendance`] and [`delete_user`]: once polling has been
//! disabled, the re-enable command is issued exactly once before any error
//! from the middle of the session is allowed to surface. A crashed read
//! must never leave the physical terminal unable to register punches.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use common::{Error, Result, SessionSettings};
use protocol::{
    AttendanceRecord, CMD_ACK_DATA, CMD_ACK_ERROR, CMD_ACK_OK, CMD_ACK_UNAUTH, CMD_ATTLOG_RRQ,
    CMD_AUTH, CMD_CONNECT, CMD_DATA, CMD_DELETE_USER, CMD_DISABLEDEVICE, CMD_ENABLEDEVICE,
    CMD_EXIT, CMD_FREE_DATA, CMD_PREPARE_BUFFER, CMD_PREPARE_DATA, CMD_READ_BUFFER,
    CMD_USERTEMP_RRQ, FCT_USER, Packet, ProtocolError, UserRecord, commkey,
    parse_attendance_log, parse_user_table, read_frame, write_frame,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Largest byte range requested per `CMD_READ_BUFFER`.
const MAX_CHUNK: usize = 0xFFC0;

/// Upper bound on a staged buffered read (covers hundreds of thousands of
/// 40-byte log entries).
const MAX_STAGED_SIZE: usize = 16 * 1024 * 1024;

/// Session lifecycle; `Disconnected` is represented by the session value
/// being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connected,
    PollingDisabled,
}

/// An established session with the terminal.
pub struct DeviceSession {
    stream: TcpStream,
    session_id: u16,
    reply_id: u16,
    timeout: Duration,
    state: SessionState,
}

impl DeviceSession {
    /// Connect and authenticate against the terminal.
    ///
    /// Everything that goes wrong before a usable session exists
    /// (unreachable host, refused port, timeout, rejected credential) is
    /// an [`Error::Connect`].
    pub async fn connect(addr: Ipv4Addr, settings: &SessionSettings) -> Result<Self> {
        let target = SocketAddr::from((addr, settings.port));
        let connect_err =
            |reason: String| Error::Connect { addr: target, reason };

        let stream = timeout(settings.timeout, TcpStream::connect(target))
            .await
            .map_err(|_| connect_err("connect timed out".to_string()))?
            .map_err(|e| connect_err(e.to_string()))?;

        let mut session = Self {
            stream,
            session_id: 0,
            reply_id: 0,
            timeout: settings.timeout,
            state: SessionState::Connected,
        };

        let reply = session
            .exchange(CMD_CONNECT, Vec::new())
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        session.session_id = reply.session_id;

        match reply.command {
            CMD_ACK_OK => {}
            CMD_ACK_UNAUTH => {
                let key = commkey(settings.password, session.session_id);
                let auth = session
                    .exchange(CMD_AUTH, key.to_vec())
                    .await
                    .map_err(|e| connect_err(e.to_string()))?;
                if auth.command != CMD_ACK_OK {
                    return Err(connect_err("device rejected the credential".to_string()));
                }
            }
            other => {
                return Err(connect_err(format!("unexpected connect reply {other:#06x}")));
            }
        }

        debug!(session_id = session.session_id, %target, "session established");
        Ok(session)
    }

    /// Stop the terminal from accepting punches while its log is read or
    /// mutated.
    pub async fn disable(&mut self) -> protocol::Result<()> {
        self.command_ok(CMD_DISABLEDEVICE).await?;
        self.state = SessionState::PollingDisabled;
        Ok(())
    }

    /// Resume accepting punches.
    pub async fn enable(&mut self) -> protocol::Result<()> {
        self.command_ok(CMD_ENABLEDEVICE).await?;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Close the session. Best-effort: the exit command failing is logged,
    /// not surfaced, since the connection is going away either way.
    pub async fn disconnect(mut self) {
        if self.state == SessionState::PollingDisabled {
            // Operations re-enable before disconnecting; reaching this
            // point disabled means a logic error worth hearing about.
            warn!("disconnecting while polling is still disabled");
        }
        if let Err(error) = self.command_ok(CMD_EXIT).await {
            warn!(%error, "device exit failed, closing connection anyway");
        }
    }

    /// Read the full attendance log.
    pub async fn read_attendance(&mut self) -> protocol::Result<Vec<AttendanceRecord>> {
        let raw = self.read_with_buffer(CMD_ATTLOG_RRQ, 0).await?;
        parse_attendance_log(&raw)
    }

    /// Read the user table.
    pub async fn read_users(&mut self) -> protocol::Result<Vec<UserRecord>> {
        let raw = self.read_with_buffer(CMD_USERTEMP_RRQ, FCT_USER).await?;
        parse_user_table(&raw)
    }

    /// Delete one user entry by its internal uid.
    pub async fn delete_uid(&mut self, uid: u16) -> protocol::Result<()> {
        let reply = self
            .exchange(CMD_DELETE_USER, uid.to_le_bytes().to_vec())
            .await?;
        match reply.command {
            CMD_ACK_OK => Ok(()),
            CMD_ACK_ERROR => Err(ProtocolError::CommandRejected {
                command: CMD_DELETE_USER,
            }),
            other => Err(ProtocolError::UnexpectedReply {
                command: CMD_DELETE_USER,
                reply: other,
            }),
        }
    }

    /// One request/response exchange, both directions bounded by the
    /// session timeout.
    async fn exchange(&mut self, command: u16, payload: Vec<u8>) -> protocol::Result<Packet> {
        let request = Packet::new(command, self.session_id, self.reply_id, payload);
        self.reply_id = self.reply_id.wrapping_add(1);

        timeout(self.timeout, write_frame(&mut self.stream, &request))
            .await
            .map_err(|_| timeout_error())??;
        timeout(self.timeout, read_frame(&mut self.stream))
            .await
            .map_err(|_| timeout_error())?
    }

    /// Send a command and require a plain OK.
    async fn command_ok(&mut self, command: u16) -> protocol::Result<()> {
        let reply = self.exchange(command, Vec::new()).await?;
        match reply.command {
            CMD_ACK_OK => Ok(()),
            CMD_ACK_ERROR => Err(ProtocolError::CommandRejected { command }),
            other => Err(ProtocolError::UnexpectedReply {
                command,
                reply: other,
            }),
        }
    }

    /// Buffered read of a record payload.
    ///
    /// Small payloads come back inline; larger ones are staged on the
    /// device and pulled down in bounded chunks, with the device-side
    /// buffer freed afterwards even when the chunk loop fails.
    async fn read_with_buffer(&mut self, inner: u16, fct: u8) -> protocol::Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(11);
        payload.push(1u8);
        payload.extend_from_slice(&inner.to_le_bytes());
        payload.extend_from_slice(&u32::from(fct).to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());

        let reply = self.exchange(CMD_PREPARE_BUFFER, payload).await?;
        match reply.command {
            CMD_DATA | CMD_ACK_DATA => Ok(reply.payload),
            CMD_ACK_OK => {
                // Staged: [flag u8][total size u32 LE]
                let total = reply
                    .payload
                    .get(1..5)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
                    .ok_or(ProtocolError::IncompleteFrame {
                        expected: 5,
                        actual: reply.payload.len(),
                    })?;

                let data = self.read_staged(total).await;
                let freed = self.command_ok(CMD_FREE_DATA).await;
                let data = data?;
                freed?;
                Ok(data)
            }
            CMD_ACK_ERROR => Err(ProtocolError::CommandRejected { command: inner }),
            other => Err(ProtocolError::UnexpectedReply {
                command: CMD_PREPARE_BUFFER,
                reply: other,
            }),
        }
    }

    /// Pull `total` staged bytes down in `MAX_CHUNK` ranges.
    async fn read_staged(&mut self, total: usize) -> protocol::Result<Vec<u8>> {
        if total > MAX_STAGED_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: total,
                max: MAX_STAGED_SIZE,
            });
        }

        let mut data = Vec::with_capacity(total);
        while data.len() < total {
            let chunk_len = (total - data.len()).min(MAX_CHUNK);
            let mut request = Vec::with_capacity(8);
            request.extend_from_slice(&(data.len() as u32).to_le_bytes());
            request.extend_from_slice(&(chunk_len as u32).to_le_bytes());

            let reply = self.exchange(CMD_READ_BUFFER, request).await?;
            let received = match reply.command {
                CMD_DATA => {
                    data.extend_from_slice(&reply.payload);
                    reply.payload.len()
                }
                // Chunk announced first, payload streamed in data frames.
                CMD_PREPARE_DATA => {
                    let mut streamed = 0usize;
                    while streamed < chunk_len {
                        let frame = timeout(self.timeout, read_frame(&mut self.stream))
                            .await
                            .map_err(|_| timeout_error())??;
                        if frame.command != CMD_DATA {
                            return Err(ProtocolError::UnexpectedReply {
                                command: CMD_READ_BUFFER,
                                reply: frame.command,
                            });
                        }
                        streamed += frame.payload.len();
                        data.extend_from_slice(&frame.payload);
                    }
                    streamed
                }
                CMD_ACK_ERROR => {
                    return Err(ProtocolError::CommandRejected {
                        command: CMD_READ_BUFFER,
                    });
                }
                other => {
                    return Err(ProtocolError::UnexpectedReply {
                        command: CMD_READ_BUFFER,
                        reply: other,
                    });
                }
            };

            if received == 0 {
                // A device that stops making progress would loop forever.
                return Err(ProtocolError::IncompleteFrame {
                    expected: total,
                    actual: data.len(),
                });
            }
        }
        Ok(data)
    }
}

/// Download the attendance log from the terminal at `addr`.
///
/// Protocol sequence: connect → disable polling → buffered log read →
/// enable polling → disconnect. The enable step runs exactly once even if
/// the read fails; the read error then propagates after cleanup.
pub async fn fetch_attendance(
    addr: Ipv4Addr,
    settings: &SessionSettings,
) -> Result<Vec<AttendanceRecord>> {
    let mut session = DeviceSession::connect(addr, settings).await?;

    if let Err(error) = session.disable().await {
        session.disconnect().await;
        return Err(error.into());
    }

    let outcome = session.read_attendance().await;
    let reenabled = session.enable().await;
    session.disconnect().await;

    let records = outcome?; // the read failure outranks an enable failure
    reenabled?;

    info!(count = records.len(), %addr, "fetched attendance log");
    Ok(records)
}

/// Remove one user record, addressed by the user id string.
///
/// Same envelope as [`fetch_attendance`]; the middle step resolves the
/// user id against the device user table and issues the delete. An absent
/// id, or a device that refuses the delete for it, is
/// [`Error::UserNotFound`], and the device's user set is left unchanged.
pub async fn delete_user(
    addr: Ipv4Addr,
    user_id: &str,
    settings: &SessionSettings,
) -> Result<()> {
    let mut session = DeviceSession::connect(addr, settings).await?;

    if let Err(error) = session.disable().await {
        session.disconnect().await;
        return Err(error.into());
    }

    let outcome = resolve_and_delete(&mut session, user_id).await;
    let reenabled = session.enable().await;
    session.disconnect().await;

    outcome?;
    reenabled?;

    info!(user_id, %addr, "user removed from device");
    Ok(())
}

async fn resolve_and_delete(session: &mut DeviceSession, user_id: &str) -> Result<()> {
    let users = session.read_users().await?;
    let Some(user) = users.iter().find(|u| u.user_id == user_id) else {
        return Err(Error::UserNotFound(user_id.to_string()));
    };
    debug!(uid = user.uid, user_id, "resolved delete target");

    match session.delete_uid(user.uid).await {
        Ok(()) => Ok(()),
        // The device refusing a delete for a uid it just listed means the
        // entry vanished between the read and the delete.
        Err(ProtocolError::CommandRejected { .. }) => {
            Err(Error::UserNotFound(user_id.to_string()))
        }
        Err(error) => Err(error.into()),
    }
}

fn timeout_error() -> ProtocolError {
    ProtocolError::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        "device did not answer within the session timeout",
    ))
}
