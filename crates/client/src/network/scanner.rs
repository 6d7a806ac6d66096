//! Bounded-concurrency subnet scan
//!
//! Probes every candidate in the range on the configured port, at most
//! `max_in_flight` probes at a time, and reports the open address with the
//! lowest suffix. Each probe task carries its own address, and results are
//! awaited in enumeration order, so the winner never depends on which
//! probe happened to finish first.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};

use common::{AddressRange, ScanSettings};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::probe::probe;

/// Subnet scanner for the terminal's protocol port.
pub struct Scanner {
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }

    /// Find the lowest-suffix address in `range` with the port open.
    ///
    /// Returns `None` when nothing responds, a normal negative result
    /// rather than an error. Once a hit is confirmed no further probes are
    /// dispatched and in-flight ones are aborted; dropping the returned
    /// future stops the scan the same way, so callers can race it against
    /// a deadline.
    pub async fn scan(&self, range: &AddressRange) -> Option<Ipv4Addr> {
        info!(
            "scanning {} for port {} ({} hosts)",
            range,
            self.settings.port,
            range.len()
        );

        let mut candidates = range.iter();
        let mut window: VecDeque<(Ipv4Addr, JoinHandle<bool>)> = VecDeque::new();

        loop {
            while window.len() < self.settings.max_in_flight {
                let Some(addr) = candidates.next() else { break };
                let target = SocketAddr::from((addr, self.settings.port));
                let limit = self.settings.probe_timeout;
                window.push_back((addr, tokio::spawn(probe(target, limit))));
            }

            // Window empty means the candidate list is exhausted too.
            let (addr, handle) = window.pop_front()?;

            if handle.await.unwrap_or(false) {
                for (_, pending) in &window {
                    pending.abort();
                }
                info!(%addr, "device found");
                return Some(addr);
            }
            debug!(%addr, "no response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn fast_settings(port: u16) -> ScanSettings {
        ScanSettings {
            port,
            probe_timeout: Duration::from_millis(250),
            max_in_flight: 50,
        }
    }

    #[tokio::test]
    async fn empty_subnet_yields_none() {
        // Reserve a port on .1 only, then scan a range that excludes it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let range = AddressRange::parse("127.0.0.2", "127.0.0.9").unwrap();
        let found = Scanner::new(fast_settings(port)).scan(&range).await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn finds_single_listener_in_range() {
        let listener = TcpListener::bind("127.0.0.7:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let range = AddressRange::parse("127.0.0.2", "127.0.0.9").unwrap();
        let found = Scanner::new(fast_settings(addr.port())).scan(&range).await;
        assert_eq!(found, Some(Ipv4Addr::new(127, 0, 0, 7)));
    }

    #[tokio::test]
    async fn lowest_suffix_wins_when_several_listen() {
        // Same port open on .4 and .8; the scan must report .4.
        let low = TcpListener::bind("127.0.0.4:0").await.unwrap();
        let port = low.local_addr().unwrap().port();
        let _high = TcpListener::bind(("127.0.0.8", port)).await.unwrap();

        let range = AddressRange::parse("127.0.0.2", "127.0.0.9").unwrap();
        for _ in 0..3 {
            let found = Scanner::new(fast_settings(port)).scan(&range).await;
            assert_eq!(found, Some(Ipv4Addr::new(127, 0, 0, 4)));
        }
    }

    #[tokio::test]
    async fn window_smaller_than_range_still_covers_everything() {
        let listener = TcpListener::bind("127.0.0.9:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let range = AddressRange::parse("127.0.0.2", "127.0.0.9").unwrap();
        let settings = ScanSettings {
            max_in_flight: 2,
            ..fast_settings(port)
        };
        let found = Scanner::new(settings).scan(&range).await;
        assert_eq!(found, Some(Ipv4Addr::new(127, 0, 0, 9)));
    }
}
