use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use tracing::trace;

use framelock_core::{
    error::{ErrorKind, Result},
    FrameNumber,
};
use framelock_protocol::{ack::FrameAck, input::FrameInput};

/// Per-peer retention store for locally produced, unacknowledged frames.
///
/// The simulation thread appends (`enqueue_local`), the receiver worker
/// applies acknowledgments (`process_ack`), and the sender worker scans for
/// retransmission (`due_for_send`); a mutex serializes the three.
#[derive(Debug)]
pub struct TransmissionQueue {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_frame_to_send: FrameNumber,
    /// Highest cumulative acknowledgment seen; ACKs travel unreliably and
    /// reorder, so this only moves forward.
    highest_cumulative_ack: FrameNumber,
    unacked: BTreeMap<FrameNumber, UnackedFrame>,
}

#[derive(Debug)]
struct UnackedFrame {
    input: FrameInput,
    /// None until the first transmission, which makes a fresh frame
    /// immediately due.
    last_send: Option<Instant>,
}

impl TransmissionQueue {
    /// Creates the queue; the first local input must carry `initial_frame`.
    pub fn new(initial_frame: FrameNumber) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_frame_to_send: initial_frame,
                highest_cumulative_ack: initial_frame - 1,
                unacked: BTreeMap::new(),
            }),
        }
    }

    /// Appends a newly produced local input for transmission.
    ///
    /// Local inputs arrive from the simulation thread in frame order; a gap
    /// or repeat means the session state is corrupt and is fatal.
    pub fn enqueue_local(&self, input: FrameInput) -> Result<()> {
        let mut inner = self.lock();
        if input.frame_number() != inner.next_frame_to_send {
            return Err(ErrorKind::Invariant(format!(
                "local input for frame {} enqueued while expecting frame {}",
                input.frame_number(),
                inner.next_frame_to_send
            )));
        }
        inner.next_frame_to_send += 1;
        inner.unacked.insert(input.frame_number(), UnackedFrame { input, last_send: None });
        Ok(())
    }

    /// Applies an acknowledgment: the cumulative point purges every frame at
    /// or below it, the selective list purges individually. Both purges are
    /// idempotent, so stale reordered ACKs cannot resurrect frames.
    pub fn process_ack(&self, ack: &FrameAck) {
        let mut inner = self.lock();
        if ack.cumulative_ack() > inner.highest_cumulative_ack {
            inner.highest_cumulative_ack = ack.cumulative_ack();
        }
        let cumulative = inner.highest_cumulative_ack;
        inner.unacked = inner.unacked.split_off(&(cumulative + 1));
        for frame in ack.selective_acks() {
            inner.unacked.remove(frame);
        }
        trace!(
            peer = ack.sender_id(),
            cumulative = ack.cumulative_ack(),
            in_flight = inner.unacked.len(),
            "acknowledgment applied"
        );
    }

    /// Returns every retained frame whose retransmission timeout has lapsed
    /// (or that was never sent), in ascending frame order, stamping each with
    /// `now` as its new send time.
    pub fn due_for_send(&self, now: Instant, rto: Duration) -> Vec<FrameInput> {
        let mut inner = self.lock();
        let mut due = Vec::new();
        for entry in inner.unacked.values_mut() {
            let is_due = match entry.last_send {
                None => true,
                Some(last) => last + rto <= now,
            };
            if is_due {
                entry.last_send = Some(now);
                due.push(entry.input.clone());
            }
        }
        due
    }

    /// Number of retained frames awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.lock().unacked.len()
    }

    /// Frame number the next local input must carry.
    pub fn next_frame_to_send(&self) -> FrameNumber {
        self.lock().next_frame_to_send
    }

    /// Highest cumulative acknowledgment applied so far.
    pub fn highest_cumulative_ack(&self) -> FrameNumber {
        self.lock().highest_cumulative_ack
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(frame: FrameNumber) -> FrameInput {
        FrameInput::new(frame, vec![frame as u8])
    }

    fn queue_with_frames(frames: &[FrameNumber]) -> TransmissionQueue {
        let queue = TransmissionQueue::new(frames[0]);
        for &frame in frames {
            queue.enqueue_local(input(frame)).unwrap();
        }
        queue
    }

    #[test]
    fn test_enqueue_rejects_out_of_order_input() {
        let queue = TransmissionQueue::new(0);
        queue.enqueue_local(input(0)).unwrap();
        assert!(matches!(queue.enqueue_local(input(2)), Err(ErrorKind::Invariant(_))));
        // The counter is untouched by the rejected input.
        assert_eq!(queue.next_frame_to_send(), 1);
    }

    #[test]
    fn test_ack_collapses_unacked() {
        // Selectively acknowledge 6 first, leaving {3, 4, 5, 7, 8} retained.
        let queue = queue_with_frames(&[3, 4, 5, 6, 7, 8]);
        queue.process_ack(&FrameAck::new(0, 2, vec![6]));
        assert_eq!(queue.in_flight(), 5);

        queue.process_ack(&FrameAck::new(0, 5, vec![8]));

        assert_eq!(queue.in_flight(), 1);
        let due = queue.due_for_send(Instant::now(), Duration::from_millis(100));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].frame_number(), 7);
    }

    #[test]
    fn test_stale_ack_cannot_rewind_cumulative() {
        let queue = queue_with_frames(&[0, 1, 2, 3]);
        queue.process_ack(&FrameAck::new(0, 2, vec![]));
        assert_eq!(queue.highest_cumulative_ack(), 2);

        // Reordered older ACK arrives late; only its selective list applies.
        queue.process_ack(&FrameAck::new(0, 0, vec![3]));
        assert_eq!(queue.highest_cumulative_ack(), 2);
        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn test_retransmission_cadence() {
        let rto = Duration::from_millis(100);
        let queue = queue_with_frames(&[4]);
        let start = Instant::now();

        // Never sent: immediately due, stamped with `start`.
        let due = queue.due_for_send(start, rto);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].frame_number(), 4);

        // Just before the timeout: nothing due.
        assert!(queue.due_for_send(start + rto - Duration::from_millis(1), rto).is_empty());

        // At the timeout boundary: due again.
        let due = queue.due_for_send(start + rto, rto);
        assert_eq!(due.len(), 1);

        // And again one full timeout after the resend.
        assert!(queue.due_for_send(start + rto + rto - Duration::from_millis(1), rto).is_empty());
        assert_eq!(queue.due_for_send(start + rto + rto, rto).len(), 1);
    }

    #[test]
    fn test_due_frames_ascend() {
        let queue = queue_with_frames(&[0, 1, 2]);
        let due = queue.due_for_send(Instant::now(), Duration::from_millis(50));
        let numbers: Vec<_> = due.iter().map(|f| f.frame_number()).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }
}
