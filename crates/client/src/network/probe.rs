//! Single-host reachability probe

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Test whether `addr` accepts a TCP connection within `limit`.
///
/// The stream is dropped the moment the connect resolves; the probe holds
/// no state. Refusal, unreachable networks, and the timeout all count as
/// "closed". These are expected, high-frequency outcomes during a sweep,
/// so none of them surface as errors.
pub async fn probe(addr: SocketAddr, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(error)) => {
            trace!(%addr, %error, "probe failed");
            false
        }
        Err(_elapsed) => {
            trace!(%addr, "probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_port_probes_true() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(probe(addr, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn closed_port_probes_false() {
        // Bind then drop to get a port that is almost certainly closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(!probe(addr, Duration::from_secs(1)).await);
    }
}
