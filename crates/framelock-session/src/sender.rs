use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use tracing::{debug, error, trace, warn};

use framelock_core::{config::Config, transport::DatagramSocket, PeerId};
use framelock_protocol::{
    codec::{self, sealing_overhead, MessageEncoder},
    input::FrameInput,
    message::Message,
};
use framelock_sync::TransmissionQueue;

use crate::{ack_buffer::AckBuffer, events::SessionEvent, liveness::Liveness, time::Clock};

/// Sender worker: on every pass it flushes coalesced acknowledgments, resends
/// every frame whose retransmission timeout lapsed, keeps idle links alive,
/// and reports peers that have gone quiet.
pub struct SenderWorker<TSocket: DatagramSocket> {
    socket: TSocket,
    local_peer: PeerId,
    peers: BTreeMap<PeerId, SocketAddr>,
    transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>>,
    acks: AckBuffer,
    liveness: Arc<Liveness>,
    events: Sender<SessionEvent>,
    stop: Arc<AtomicBool>,
    config: Config,
    clock: Arc<dyn Clock>,
    last_sent: HashMap<PeerId, Instant>,
    idle_reported: HashSet<PeerId>,
}

impl<TSocket: DatagramSocket> SenderWorker<TSocket> {
    /// Creates the worker for a fixed peer set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        socket: TSocket,
        local_peer: PeerId,
        peers: BTreeMap<PeerId, SocketAddr>,
        transmission_queues: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>>,
        acks: AckBuffer,
        liveness: Arc<Liveness>,
        events: Sender<SessionEvent>,
        stop: Arc<AtomicBool>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            socket,
            local_peer,
            peers,
            transmission_queues,
            acks,
            liveness,
            events,
            stop,
            config,
            clock,
            last_sent: HashMap::new(),
            idle_reported: HashSet::new(),
        }
    }

    /// Runs transmission passes at the tick cadence until the stop flag is
    /// raised.
    pub fn run(mut self) {
        let pass_interval =
            Duration::from_millis((1000 / u64::from(self.config.tick_rate_hz.max(1))).max(1));
        while !self.stop.load(Ordering::Relaxed) {
            self.pass();
            thread::sleep(pass_interval);
        }
        debug!(peer = self.local_peer, "sender worker stopped");
    }

    /// One transmission pass: ACKs, due frames, keep-alives, idle checks.
    pub fn pass(&mut self) {
        let now = self.clock.now();
        self.flush_acks(now);
        self.send_due_frames(now);
        self.send_keepalives(now);
        self.check_liveness(now);
    }

    fn flush_acks(&mut self, now: Instant) {
        for ack in self.acks.drain_coalesced() {
            let peer = ack.sender_id();
            match self.peers.get(&peer).copied() {
                Some(addr) => self.send_message(&Message::Ack(ack), peer, addr, now),
                None => warn!(peer, "acknowledgment for an unknown peer discarded"),
            }
        }
    }

    fn send_due_frames(&mut self, now: Instant) {
        let peers: Vec<(PeerId, SocketAddr)> =
            self.peers.iter().map(|(&peer, &addr)| (peer, addr)).collect();
        for (peer, addr) in peers {
            let Some(queue) = self.transmission_queues.get(&peer) else { continue };
            let due = queue.due_for_send(now, self.config.retransmission_timeout);
            if due.is_empty() {
                continue;
            }
            trace!(peer, frames = due.len(), "sending due frames");
            for batch in self.partition_to_fit(due) {
                let message = Message::InputBatch { sender_id: self.local_peer, frames: batch };
                self.send_message(&message, peer, addr, now);
            }
        }
    }

    /// Splits due frames into batches whose sealed size stays under the
    /// datagram ceiling, budgeting with the uncompressed encoding since
    /// compression never expands a sealed datagram beyond it.
    fn partition_to_fit(&self, frames: Vec<FrameInput>) -> Vec<Vec<FrameInput>> {
        let empty_batch =
            Message::InputBatch { sender_id: self.local_peer, frames: Vec::new() };
        let base = MessageEncoder::message_wire_size(&empty_batch)
            + sealing_overhead(self.config.use_checksums);
        let budget = self.config.max_datagram_size;

        let mut batches = Vec::new();
        let mut batch: Vec<FrameInput> = Vec::new();
        let mut batch_size = base;
        for frame in frames {
            let frame_size = MessageEncoder::frame_wire_size(&frame);
            if !batch.is_empty() && batch_size + frame_size > budget {
                batches.push(std::mem::take(&mut batch));
                batch_size = base;
            }
            batch_size += frame_size;
            batch.push(frame);
        }
        if !batch.is_empty() {
            batches.push(batch);
        }
        batches
    }

    fn send_keepalives(&mut self, now: Instant) {
        let peers: Vec<(PeerId, SocketAddr)> =
            self.peers.iter().map(|(&peer, &addr)| (peer, addr)).collect();
        for (peer, addr) in peers {
            let quiet = self
                .last_sent
                .get(&peer)
                .map_or(true, |last| now.saturating_duration_since(*last) >= self.config.keepalive_interval);
            if quiet {
                trace!(peer, "sending keep-alive");
                self.send_message(&Message::KeepAlive, peer, addr, now);
            }
        }
    }

    fn check_liveness(&mut self, now: Instant) {
        for (&peer, addr) in &self.peers {
            let Some(heard) = self.liveness.last_heard(addr) else { continue };
            let idle = now.saturating_duration_since(heard) >= self.config.idle_peer_timeout;
            if idle && self.idle_reported.insert(peer) {
                warn!(peer, "peer has gone quiet");
                let _ = self.events.send(SessionEvent::PeerIdle(peer));
            } else if !idle && self.idle_reported.remove(&peer) {
                debug!(peer, "peer is heard from again");
                let _ = self.events.send(SessionEvent::PeerRecovered(peer));
            }
        }
    }

    fn send_message(&mut self, message: &Message, peer: PeerId, addr: SocketAddr, now: Instant) {
        let datagram = match codec::seal(message, &self.config) {
            Ok(datagram) => datagram,
            Err(err) => {
                error!(peer, %err, "dropping unsendable datagram");
                return;
            }
        };
        match self.socket.send_datagram(&addr, &datagram) {
            Ok(_) => {
                self.last_sent.insert(peer, now);
            }
            Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
                warn!(peer, %addr, "peer port unreachable");
                let _ = self.events.send(SessionEvent::PeerUnreachable(peer));
            }
            Err(err) => error!(peer, %addr, %err, "error sending a datagram"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crossbeam_channel::unbounded;

    use framelock_core::config::CompressionAlgorithm;
    use framelock_protocol::ack::FrameAck;

    use super::*;

    /// Socket double that records every datagram it is asked to send.
    #[derive(Clone, Default)]
    struct RecordingSocket {
        sent: Arc<Mutex<Vec<(SocketAddr, Vec<u8>)>>>,
    }

    impl DatagramSocket for RecordingSocket {
        fn send_datagram(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
            self.sent.lock().unwrap().push((*addr, payload.to_vec()));
            Ok(payload.len())
        }
        fn receive_datagram<'a>(
            &mut self,
            _buffer: &'a mut [u8],
        ) -> io::Result<(&'a [u8], SocketAddr)> {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }
        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:0".parse().unwrap())
        }
    }

    /// Manually advanced clock.
    struct TestClock {
        now: Mutex<Instant>,
    }

    impl TestClock {
        fn new(start: Instant) -> Self {
            Self { now: Mutex::new(start) }
        }
        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    fn test_config() -> Config {
        Config {
            compression: CompressionAlgorithm::None,
            retransmission_timeout: Duration::from_millis(100),
            keepalive_interval: Duration::from_millis(500),
            idle_peer_timeout: Duration::from_secs(2),
            ..Config::default()
        }
    }

    struct Fixture {
        worker: SenderWorker<RecordingSocket>,
        socket: RecordingSocket,
        queue: Arc<TransmissionQueue>,
        acks: AckBuffer,
        clock: Arc<TestClock>,
        events: crossbeam_channel::Receiver<SessionEvent>,
        liveness: Arc<Liveness>,
        remote_addr: SocketAddr,
    }

    fn fixture() -> Fixture {
        let config = test_config();
        let remote_addr: SocketAddr = "127.0.0.1:9002".parse().unwrap();
        let peers: BTreeMap<PeerId, SocketAddr> = [(2, remote_addr)].into();

        let queue = Arc::new(TransmissionQueue::new(0));
        let transmission: Arc<BTreeMap<PeerId, Arc<TransmissionQueue>>> =
            Arc::new([(2, Arc::clone(&queue))].into());

        let socket = RecordingSocket::default();
        let acks = AckBuffer::new();
        let start = Instant::now();
        let clock = Arc::new(TestClock::new(start));
        let liveness = Arc::new(Liveness::new(peers.values(), start));
        let (event_sender, events) = unbounded();

        let worker = SenderWorker::new(
            socket.clone(),
            1,
            peers,
            transmission,
            acks.clone(),
            Arc::clone(&liveness),
            event_sender,
            Arc::new(AtomicBool::new(false)),
            config,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Fixture { worker, socket, queue, acks, clock, events, liveness, remote_addr }
    }

    fn sent_messages(socket: &RecordingSocket, config: &Config) -> Vec<Message> {
        socket
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, datagram)| codec::open(datagram, config).unwrap())
            .collect()
    }

    #[test]
    fn test_due_frames_sent_and_resent_on_timeout() {
        let mut fx = fixture();
        fx.queue.enqueue_local(FrameInput::new(0, vec![7])).unwrap();

        fx.worker.pass();
        let messages = sent_messages(&fx.socket, &test_config());
        assert!(matches!(
            &messages[0],
            Message::InputBatch { sender_id: 1, frames } if frames.len() == 1
        ));

        // Before the timeout: nothing further for this frame.
        fx.socket.sent.lock().unwrap().clear();
        fx.clock.advance(Duration::from_millis(30));
        fx.worker.pass();
        assert!(sent_messages(&fx.socket, &test_config())
            .iter()
            .all(|m| matches!(m, Message::KeepAlive)));

        // Past the timeout: the unacknowledged frame goes out again.
        fx.clock.advance(Duration::from_millis(100));
        fx.worker.pass();
        let resent = sent_messages(&fx.socket, &test_config())
            .into_iter()
            .filter(|m| matches!(m, Message::InputBatch { .. }))
            .count();
        assert_eq!(resent, 1);
    }

    #[test]
    fn test_acknowledged_frames_stop_retransmitting() {
        let mut fx = fixture();
        fx.queue.enqueue_local(FrameInput::new(0, vec![7])).unwrap();
        fx.worker.pass();

        fx.queue.process_ack(&FrameAck::new(0, 0, vec![]));
        fx.socket.sent.lock().unwrap().clear();
        fx.clock.advance(Duration::from_millis(300));
        fx.worker.pass();
        assert!(sent_messages(&fx.socket, &test_config())
            .iter()
            .all(|m| !matches!(m, Message::InputBatch { .. })));
    }

    #[test]
    fn test_ack_flush_targets_acknowledged_peer() {
        let mut fx = fixture();
        fx.acks.post(FrameAck::new(2, 5, vec![8]));
        fx.worker.pass();

        let sent = fx.socket.sent.lock().unwrap();
        let (addr, datagram) = &sent[0];
        assert_eq!(*addr, fx.remote_addr);
        let message = codec::open(datagram, &test_config()).unwrap();
        assert_eq!(message, Message::Ack(FrameAck::new(2, 5, vec![8])));
    }

    #[test]
    fn test_batches_split_to_datagram_ceiling() {
        let mut fx = fixture();
        // Forty incompressible-ish frames of 20 bytes overflow one datagram.
        for frame in 0..40 {
            fx.queue.enqueue_local(FrameInput::new(frame, vec![frame as u8; 20])).unwrap();
        }
        fx.worker.pass();

        let config = test_config();
        let sent = fx.socket.sent.lock().unwrap();
        let batches: Vec<Message> = sent
            .iter()
            .map(|(_, datagram)| codec::open(datagram, &config).unwrap())
            .filter(|m| matches!(m, Message::InputBatch { .. }))
            .collect();
        assert!(batches.len() > 1);
        for (_, datagram) in sent.iter() {
            assert!(datagram.len() <= config.max_datagram_size);
        }

        // All forty frames crossed, in ascending order overall.
        let mut numbers = Vec::new();
        for message in &batches {
            if let Message::InputBatch { frames, .. } = message {
                numbers.extend(frames.iter().map(|f| f.frame_number()));
            }
        }
        assert_eq!(numbers, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_keepalive_only_when_quiet() {
        let mut fx = fixture();
        // First pass with nothing queued: keep-alive goes out.
        fx.worker.pass();
        let messages = sent_messages(&fx.socket, &test_config());
        assert!(matches!(messages[0], Message::KeepAlive));

        // Immediately after, the link is not quiet.
        fx.socket.sent.lock().unwrap().clear();
        fx.worker.pass();
        assert!(sent_messages(&fx.socket, &test_config()).is_empty());

        // Quiet past the interval again.
        fx.clock.advance(Duration::from_millis(600));
        fx.worker.pass();
        assert!(matches!(sent_messages(&fx.socket, &test_config())[0], Message::KeepAlive));
    }

    #[test]
    fn test_idle_peer_reported_once_and_recovery() {
        let mut fx = fixture();
        fx.clock.advance(Duration::from_secs(3));
        fx.worker.pass();
        fx.worker.pass();
        assert_eq!(fx.events.try_recv(), Ok(SessionEvent::PeerIdle(2)));
        assert!(fx.events.try_recv().is_err());

        // A datagram arrives; the next pass reports recovery.
        fx.liveness.record(fx.remote_addr, fx.clock.now());
        fx.worker.pass();
        assert_eq!(fx.events.try_recv(), Ok(SessionEvent::PeerRecovered(2)));
    }
}
