use std::{
    collections::BTreeMap,
    net::{SocketAddr, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::Instant,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use framelock_core::{
    config::Config,
    error::{ErrorKind, Result},
    transport::DatagramSocket,
    PeerId,
};
use framelock_protocol::input::FrameInput;
use framelock_sync::{CyclicBarrier, ReceivingQueue, TransmissionQueue};

use crate::{
    ack_buffer::AckBuffer,
    events::SessionEvent,
    liveness::Liveness,
    receiver::ReceiverWorker,
    sender::SenderWorker,
    socket::SessionSocket,
    time::{Clock, SystemClock},
};

/// One peer's view of a running lockstep session.
///
/// Owns one receiving queue and one transmission queue per remote peer, the
/// shared frame barrier, and the two worker threads. The host's simulation
/// thread drives the tick:
///
/// ```ignore
/// session.enqueue_local_input(my_input)?;
/// session.await_frame()?;
/// for (peer, input) in session.collect_frame()? {
///     simulate(peer, input);
/// }
/// ```
pub struct LockstepSession {
    local_peer: PeerId,
    local_addr: SocketAddr,
    barrier: Arc<CyclicBarrier>,
    receiving_queues: Arc<BTreeMap<PeerId, Arc<ReceivingQueue>>>,
    transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>>,
    events: Receiver<SessionEvent>,
    event_sender: Sender<SessionEvent>,
    stop: Arc<AtomicBool>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl LockstepSession {
    /// Binds a socket and starts the session's workers.
    ///
    /// `peers` maps every *remote* participant to its address; the local peer
    /// must not appear in it. `config.initial_frame` must match on all peers.
    pub fn bind<A: ToSocketAddrs>(
        addresses: A,
        local_peer: PeerId,
        peers: BTreeMap<PeerId, SocketAddr>,
        config: Config,
    ) -> Result<Self> {
        let socket = SessionSocket::bind(addresses, &config)?;
        Self::with_socket(socket, local_peer, peers, config)
    }

    /// Starts a session over an already bound socket.
    pub fn with_socket(
        socket: SessionSocket,
        local_peer: PeerId,
        peers: BTreeMap<PeerId, SocketAddr>,
        config: Config,
    ) -> Result<Self> {
        Self::with_socket_and_clock(socket, local_peer, peers, config, Arc::new(SystemClock))
    }

    /// Starts a session with a custom time source for the sender worker.
    pub fn with_socket_and_clock(
        socket: SessionSocket,
        local_peer: PeerId,
        peers: BTreeMap<PeerId, SocketAddr>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if peers.is_empty() {
            return Err(ErrorKind::Invariant(
                "a lockstep session needs at least one remote peer".to_owned(),
            ));
        }
        if peers.contains_key(&local_peer) {
            return Err(ErrorKind::Invariant(
                "the remote peer set must not contain the local peer".to_owned(),
            ));
        }

        let local_addr = socket.local_addr()?;
        let barrier = Arc::new(CyclicBarrier::new(peers.len()));

        let receiving_queues: Arc<BTreeMap<PeerId, Arc<ReceivingQueue>>> = Arc::new(
            peers
                .keys()
                .map(|&peer| {
                    (
                        peer,
                        Arc::new(ReceivingQueue::new(
                            peer,
                            config.initial_frame,
                            config.buffer_size_hint,
                            Arc::clone(&barrier),
                        )),
                    )
                })
                .collect(),
        );
        let transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>> = Arc::new(
            peers
                .keys()
                .map(|&peer| (peer, Arc::new(TransmissionQueue::new(config.initial_frame))))
                .collect(),
        );

        let acks = AckBuffer::new();
        let liveness = Arc::new(Liveness::new(peers.values(), Instant::now()));
        let (event_sender, events) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let receiver = ReceiverWorker::new(
            socket.try_clone()?,
            local_peer,
            &peers,
            Arc::clone(&receiving_queues),
            Arc::clone(&transmission_queues),
            acks.clone(),
            Arc::clone(&liveness),
            Arc::clone(&stop),
            config.clone(),
        );
        let sender = SenderWorker::new(
            socket,
            local_peer,
            peers,
            Arc::clone(&transmission_queues),
            acks,
            liveness,
            event_sender.clone(),
            Arc::clone(&stop),
            config,
            clock,
        );

        let receiver_handle = std::thread::Builder::new()
            .name(format!("framelock-receiver-{local_peer}"))
            .spawn(move || receiver.run())?;
        let sender_handle = std::thread::Builder::new()
            .name(format!("framelock-sender-{local_peer}"))
            .spawn(move || sender.run())?;

        debug!(peer = local_peer, %local_addr, "lockstep session started");
        Ok(Self {
            local_peer,
            local_addr,
            barrier,
            receiving_queues,
            transmission_queues,
            events,
            event_sender,
            stop,
            worker_handles: Mutex::new(vec![receiver_handle, sender_handle]),
        })
    }

    /// Hands the local input for the next frame to every per-peer
    /// transmission queue. Must be called with consecutive frame numbers
    /// starting at `initial_frame`; a gap is fatal.
    pub fn enqueue_local_input(&self, input: FrameInput) -> Result<()> {
        for queue in self.transmission_queues.values() {
            queue.enqueue_local(input.clone())?;
        }
        Ok(())
    }

    /// Blocks the simulation thread until one input from every remote peer
    /// is available for the current frame. Fails with `Interrupted` once the
    /// session is shut down.
    pub fn await_frame(&self) -> Result<()> {
        self.barrier.wait()
    }

    /// Pops the current frame's input from every peer, in ascending peer-id
    /// order. Call once per successful [`await_frame`](Self::await_frame).
    pub fn collect_frame(&self) -> Result<Vec<(PeerId, FrameInput)>> {
        let mut inputs = Vec::with_capacity(self.receiving_queues.len());
        for (&peer, queue) in self.receiving_queues.iter() {
            let input = queue.pop().ok_or_else(|| {
                ErrorKind::Invariant(format!(
                    "frame barrier released but input from peer {peer} is missing"
                ))
            })?;
            inputs.push((peer, input));
        }
        Ok(inputs)
    }

    /// Peeks at the head input from one peer without consuming it.
    pub fn head_input(&self, peer: PeerId) -> Option<FrameInput> {
        self.receiving_queues.get(&peer).and_then(|queue| queue.head())
    }

    /// Returns the channel on which the workers report link health.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    /// This peer's id within the session.
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer
    }

    /// The address the session socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the workers, unblocks the simulation thread, and joins the
    /// worker threads. Idempotent; also invoked on drop. In-flight frames
    /// are not flushed; sessions are ephemeral.
    pub fn shutdown(&self) {
        if self.stop.swap(true, Ordering::Relaxed) {
            return;
        }
        self.barrier.cancel();
        if let Ok(mut handles) = self.worker_handles.lock() {
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }
        let _ = self.event_sender.send(SessionEvent::Stopped);
        debug!(peer = self.local_peer, "lockstep session stopped");
    }
}

impl Drop for LockstepSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
