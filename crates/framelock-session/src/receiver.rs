use std::{
    collections::{BTreeMap, HashMap},
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use tracing::{debug, error, trace, warn};

use framelock_core::{config::Config, transport::DatagramSocket, PeerId};
use framelock_protocol::{codec, input::FrameInput, message::Message};
use framelock_sync::{ReceivingQueue, TransmissionQueue};

use crate::{ack_buffer::AckBuffer, liveness::Liveness};

/// Receiver worker: drains the socket, opens datagrams, and routes messages
/// to the per-peer queues. Transient per-datagram failures are logged and
/// absorbed; only the session stop flag ends the loop.
pub struct ReceiverWorker<TSocket: DatagramSocket> {
    socket: TSocket,
    local_peer: PeerId,
    peer_by_addr: HashMap<SocketAddr, PeerId>,
    receiving_queues: Arc<BTreeMap<PeerId, Arc<ReceivingQueue>>>,
    transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>>,
    acks: AckBuffer,
    liveness: Arc<Liveness>,
    stop: Arc<AtomicBool>,
    config: Config,
}

impl<TSocket: DatagramSocket> ReceiverWorker<TSocket> {
    /// Creates the worker for a fixed peer set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        socket: TSocket,
        local_peer: PeerId,
        peers: &BTreeMap<PeerId, SocketAddr>,
        receiving_queues: Arc<BTreeMap<PeerId, Arc<ReceivingQueue>>>,
        transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>>,
        acks: AckBuffer,
        liveness: Arc<Liveness>,
        stop: Arc<AtomicBool>,
        config: Config,
    ) -> Self {
        Self {
            socket,
            local_peer,
            peer_by_addr: peers.iter().map(|(&peer, &addr)| (addr, peer)).collect(),
            receiving_queues,
            transmission_queues,
            acks,
            liveness,
            stop,
            config,
        }
    }

    /// Runs the drain loop until the stop flag is raised.
    pub fn run(mut self) {
        let mut buffer = vec![0u8; self.config.max_datagram_size];
        while !self.stop.load(Ordering::Relaxed) {
            match self.socket.receive_datagram(&mut buffer) {
                Ok((datagram, addr)) => self.handle_datagram(datagram, addr),
                Err(err) => match err.kind() {
                    // Read timeout: loop around and recheck the stop flag.
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {}
                    // ICMP port unreachable surfaces on the next read on some
                    // platforms; the sender worker attributes it per peer.
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                        debug!("socket reported an unreachable remote port");
                    }
                    _ => {
                        error!(%err, "error receiving a datagram");
                        std::thread::sleep(self.config.socket_read_timeout);
                    }
                },
            }
        }
        debug!(peer = self.local_peer, "receiver worker stopped");
    }

    /// Opens and dispatches one datagram. Undecodable datagrams are dropped.
    pub fn handle_datagram(&self, datagram: &[u8], addr: SocketAddr) {
        self.liveness.record(addr, Instant::now());

        let message = match codec::open(datagram, &self.config) {
            Ok(message) => message,
            Err(err) => {
                warn!(%addr, %err, "dropping undecodable datagram");
                return;
            }
        };

        match message {
            Message::Input { sender_id, frame } => self.buffer_inputs(sender_id, vec![frame]),
            Message::InputBatch { sender_id, frames } => self.buffer_inputs(sender_id, frames),
            Message::Ack(ack) => {
                if ack.sender_id() != self.local_peer {
                    warn!(
                        %addr,
                        acknowledged = ack.sender_id(),
                        "dropping acknowledgment addressed to a different peer"
                    );
                    return;
                }
                match self.peer_by_addr.get(&addr) {
                    Some(peer) => {
                        // The queue map and the address map share a key set.
                        if let Some(queue) = self.transmission_queues.get(peer) {
                            queue.process_ack(&ack);
                        }
                    }
                    None => warn!(%addr, "dropping acknowledgment from an unknown address"),
                }
            }
            Message::KeepAlive => trace!(%addr, "keep-alive received"),
        }
    }

    fn buffer_inputs(&self, sender_id: PeerId, frames: Vec<FrameInput>) {
        match self.receiving_queues.get(&sender_id) {
            Some(queue) => {
                let count = frames.len();
                let ack = queue.push(frames);
                trace!(
                    peer = sender_id,
                    frames = count,
                    cumulative = ack.cumulative_ack(),
                    "inputs buffered"
                );
                self.acks.post(ack);
            }
            None => warn!(peer = sender_id, "dropping input from an unknown peer id"),
        }
    }
}
