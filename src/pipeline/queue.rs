//! Bounded frame queue with overwrite-oldest backpressure

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use ringbuf::{
    traits::{Consumer, Observer, RingBuffer},
    HeapRb,
};

use crate::transport::Frame;

/// Bounded queue for one output stream. A full queue drops its oldest
/// entry on push, so the consumer always finds the freshest frames.
pub struct FrameQueue {
    ring: HeapRb<Frame>,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    frames_written: AtomicUsize,
    frames_read: AtomicUsize,
    frames_dropped: AtomicUsize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Producer: push a frame, displacing the oldest when full
    pub fn push(&mut self, frame: Frame) {
        if self.ring.push_overwrite(frame).is_some() {
            self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Consumer: take everything currently buffered, oldest first
    pub fn drain(&mut self) -> Vec<Frame> {
        let frames: Vec<Frame> = self.ring.pop_iter().collect();
        self.stats
            .frames_read
            .fetch_add(frames.len(), Ordering::Relaxed);
        frames
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// (written, read, dropped)
    pub fn stats(&self) -> (usize, usize, usize) {
        (
            self.stats.frames_written.load(Ordering::Relaxed),
            self.stats.frames_read.load(Ordering::Relaxed),
            self.stats.frames_dropped.load(Ordering::Relaxed),
        )
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("capacity", &self.ring.capacity().get())
            .field("len", &self.ring.occupied_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::catalog::StreamKind;
    use crate::transport::FrameMetadata;
    use bytes::Bytes;

    fn frame(sequence: i64) -> Frame {
        Frame::new(
            Bytes::from_static(&[0u8; 4]),
            FrameMetadata {
                kind: StreamKind::Color,
                sequence,
                width: 2,
                height: 2,
                timestamp_ns: sequence * 1_000,
            },
        )
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut q = FrameQueue::new(4);
        for seq in 0..6 {
            q.push(frame(seq));
        }

        let frames = q.drain();
        let seqs: Vec<i64> = frames.iter().map(|f| f.meta.sequence).collect();
        assert_eq!(seqs, vec![2, 3, 4, 5]);

        let (written, read, dropped) = q.stats();
        assert_eq!(written, 6);
        assert_eq!(read, 4);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut q = FrameQueue::new(4);
        q.push(frame(0));
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain().len(), 1);
        assert!(q.is_empty());
        assert!(q.drain().is_empty());
    }
}
