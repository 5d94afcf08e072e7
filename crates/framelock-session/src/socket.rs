use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use socket2::Socket as Socket2;

use framelock_core::{config::Config, error::Result, transport::DatagramSocket};

/// Applies socket options from configuration to a UdpSocket.
fn apply_socket_options(socket: &UdpSocket, config: &Config) -> io::Result<()> {
    let socket2 = Socket2::from(socket.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }
    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    Ok(())
}

/// UDP socket configured for session use: bounded blocking reads so the
/// receiver worker can observe the stop flag, plus any buffer sizing from the
/// configuration.
#[derive(Debug)]
pub struct SessionSocket {
    socket: UdpSocket,
}

impl SessionSocket {
    /// Binds to the given address and applies the configured socket options.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: &Config) -> Result<Self> {
        let socket = UdpSocket::bind(addresses)?;
        apply_socket_options(&socket, config)?;
        socket.set_read_timeout(Some(config.socket_read_timeout))?;
        Ok(Self { socket })
    }

    /// Creates a second handle on the same socket; the receiver and sender
    /// workers each own one.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self { socket: self.socket.try_clone()? })
    }
}

impl DatagramSocket for SessionSocket {
    fn send_datagram(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, addr)
    }

    fn receive_datagram<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        self.socket.recv_from(buffer).map(move |(length, address)| (&buffer[..length], address))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
