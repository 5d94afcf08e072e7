use std::{collections::HashMap, net::SocketAddr, sync::Mutex, time::Instant};

/// Last-heard registry shared between the receiver worker (which records
/// every datagram, keep-alives included) and the sender worker (which checks
/// idle timeouts).
///
/// Keyed by address rather than peer id because keep-alive datagrams carry no
/// sender field; the source address is the only attribution available.
#[derive(Debug)]
pub struct Liveness {
    last_heard: Mutex<HashMap<SocketAddr, Instant>>,
}

impl Liveness {
    /// Creates the registry with every known peer considered heard at
    /// session start, so idle timers measure from there.
    pub fn new<'a>(addrs: impl IntoIterator<Item = &'a SocketAddr>, start: Instant) -> Self {
        Self {
            last_heard: Mutex::new(addrs.into_iter().map(|addr| (*addr, start)).collect()),
        }
    }

    /// Records a datagram from `addr`.
    pub fn record(&self, addr: SocketAddr, now: Instant) {
        if let Ok(mut last_heard) = self.last_heard.lock() {
            last_heard.insert(addr, now);
        }
    }

    /// Returns when `addr` was last heard from, if it is known at all.
    pub fn last_heard(&self, addr: &SocketAddr) -> Option<Instant> {
        self.last_heard.lock().ok().and_then(|map| map.get(addr).copied())
    }
}
