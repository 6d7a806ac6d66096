//! Session key derivation for `CMD_AUTH`
//!
//! When a device has a communication password set, it answers `CMD_CONNECT`
//! with `CMD_ACK_UNAUTH` and expects a 4-byte commkey derived from the
//! password and the session id it just assigned: the password is
//! bit-reversed, offset by the session id, XOR-masked with the `ZKSO` tag,
//! half-swapped, and finally XOR-folded with a ticks byte that is also
//! transmitted in clear as the third byte.

const TICKS: u8 = 50;

/// Derive the 4-byte commkey sent as the `CMD_AUTH` payload.
pub fn commkey(password: u32, session_id: u16) -> [u8; 4] {
    let mut k: u32 = 0;
    for i in 0..32 {
        k <<= 1;
        if password & (1 << i) != 0 {
            k |= 1;
        }
    }
    let k = k.wrapping_add(u32::from(session_id));

    let b = k.to_le_bytes();
    let masked = [b[0] ^ b'Z', b[1] ^ b'K', b[2] ^ b'S', b[3] ^ b'O'];
    // 16-bit halves swap places before the ticks fold.
    let swapped = [masked[2], masked[3], masked[0], masked[1]];

    [
        swapped[0] ^ TICKS,
        swapped[1] ^ TICKS,
        TICKS,
        swapped[3] ^ TICKS,
    ]
}
