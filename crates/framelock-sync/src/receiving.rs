use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, trace, warn};

use framelock_core::{FrameNumber, PeerId};
use framelock_protocol::{ack::FrameAck, input::FrameInput};

use crate::barrier::CyclicBarrier;

/// Per-peer reorder buffer.
///
/// Supports out-of-order and batched insertion but only in-order, single
/// extraction: `push` is called by the receiver worker, `pop`/`head` by the
/// simulation thread, concurrently. One short-held mutex serializes the two
/// sides.
///
/// There is no hard ceiling on buffered frames: a frame arbitrarily far
/// ahead of the consumer is accepted, because rejecting it would require a
/// retransmission-triggering NACK scheme this protocol does not use. The
/// configured buffer size is a sizing hint only; a malicious or runaway peer
/// can therefore grow this buffer without bound.
#[derive(Debug)]
pub struct ReceivingQueue {
    peer_id: PeerId,
    /// Advisory sizing hint; crossing it is logged, never rejected.
    buffer_size_hint: usize,
    barrier: Arc<CyclicBarrier>,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Frame the simulation will consume next.
    buffer_head: FrameNumber,
    /// Highest frame with no gaps below it.
    last_in_order: FrameNumber,
    pending: BTreeMap<FrameNumber, FrameInput>,
    selective_acks: BTreeSet<FrameNumber>,
    /// Whether the countdown for the current `buffer_head` already fired.
    countdown_fired: bool,
}

impl ReceivingQueue {
    /// Creates the queue for frames arriving from `peer_id`.
    ///
    /// `initial_frame` must be the same on every peer of the session.
    /// `buffer_size_hint` should be dimensioned so that frames buffered ahead
    /// of the simulation fit without the log noise of crossing it.
    pub fn new(
        peer_id: PeerId,
        initial_frame: FrameNumber,
        buffer_size_hint: usize,
        barrier: Arc<CyclicBarrier>,
    ) -> Self {
        debug!(peer = peer_id, head = initial_frame, "receiving queue initialized");
        Self {
            peer_id,
            buffer_size_hint,
            barrier,
            inner: Mutex::new(Inner {
                buffer_head: initial_frame,
                last_in_order: initial_frame - 1,
                pending: BTreeMap::new(),
                selective_acks: BTreeSet::new(),
                countdown_fired: false,
            }),
        }
    }

    /// Ingests frames from this queue's peer, in any order, duplicates and
    /// already-delivered frames tolerated. Returns the acknowledgment to
    /// transmit back, snapshotted after all insertions.
    pub fn push<I>(&self, frames: I) -> FrameAck
    where
        I: IntoIterator<Item = FrameInput>,
    {
        let mut inner = self.lock();
        for frame in frames {
            self.insert(&mut inner, frame);
        }
        FrameAck::new(
            self.peer_id,
            inner.last_in_order,
            inner.selective_acks.iter().copied().collect(),
        )
    }

    /// Extracts the next in-order frame, if present, and advances the head.
    /// Called only by the simulation thread.
    pub fn pop(&self) -> Option<FrameInput> {
        let mut inner = self.lock();
        let head = inner.buffer_head;
        match inner.pending.remove(&head) {
            Some(input) => {
                inner.buffer_head += 1;
                inner.countdown_fired = false;
                // The next tick's frame may already be buffered.
                self.fire_if_head_ready(&mut inner);
                Some(input)
            }
            None => {
                debug!(peer = self.peer_id, frame = head, "input missing for current frame");
                None
            }
        }
    }

    /// Shows the next in-order frame without modifying the queue.
    pub fn head(&self) -> Option<FrameInput> {
        let inner = self.lock();
        inner.pending.get(&inner.buffer_head).cloned()
    }

    /// Advisory view of the frame the simulation will consume next.
    pub fn buffer_head(&self) -> FrameNumber {
        self.lock().buffer_head
    }

    /// Advisory view of the highest gap-free frame received.
    pub fn last_in_order(&self) -> FrameNumber {
        self.lock().last_in_order
    }

    fn insert(&self, inner: &mut Inner, frame: FrameInput) {
        let number = frame.frame_number();
        if number < inner.buffer_head {
            trace!(peer = self.peer_id, frame = number, "frame below head discarded");
            return;
        }
        if inner.pending.contains_key(&number) {
            trace!(peer = self.peer_id, frame = number, "duplicate frame discarded");
            return;
        }
        inner.pending.insert(number, frame);
        if inner.pending.len() == self.buffer_size_hint + 1 {
            warn!(
                peer = self.peer_id,
                hint = self.buffer_size_hint,
                "reorder buffer exceeds its sizing hint"
            );
        }

        if number == inner.last_in_order + 1 {
            inner.last_in_order += 1;
            // Collapse any contiguous run that was waiting above the gap.
            while inner.selective_acks.first() == Some(&(inner.last_in_order + 1)) {
                inner.selective_acks.pop_first();
                inner.last_in_order += 1;
            }
        } else {
            inner.selective_acks.insert(number);
        }

        self.fire_if_head_ready(inner);
    }

    /// Exactly one countdown per head position, fired the moment the frame at
    /// `buffer_head` first becomes available, whether that happens through
    /// arrival or through head advancement.
    fn fire_if_head_ready(&self, inner: &mut Inner) {
        if !inner.countdown_fired && inner.pending.contains_key(&inner.buffer_head) {
            inner.countdown_fired = true;
            debug!(peer = self.peer_id, frame = inner.buffer_head, "counting down frame barrier");
            self.barrier.count_down();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding this short lock is already fatal to the
        // session; propagating the poison adds nothing.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
