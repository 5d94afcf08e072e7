//! Transport abstraction for pluggable datagram I/O.

use std::{io::Result, net::SocketAddr};

/// Low-level datagram socket abstraction.
///
/// This trait lets various transports (UDP, loopback test doubles, emulators)
/// be plugged into the session workers without coupling to a concrete
/// implementation. Receiving is expected to honor a read timeout so the
/// workers can observe the session stop flag.
pub trait DatagramSocket {
    /// Sends a single datagram to the given address.
    fn send_datagram(&mut self, addr: &SocketAddr, payload: &[u8]) -> Result<usize>;

    /// Receives a single datagram, blocking up to the configured read timeout.
    fn receive_datagram<'a>(&mut self, buffer: &'a mut [u8]) -> Result<(&'a [u8], SocketAddr)>;

    /// Returns the local address this socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;
}
