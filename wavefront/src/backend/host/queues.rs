use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::gpu::Ray;
use crate::QueueSlot;

/// Pair of fixed-capacity ray arenas; which one is read from and which one is
/// written to is decided by the caller, never by the queues themselves.
#[derive(Clone, Debug, Default)]
pub struct RayQueues {
    a: Vec<Ray>,
    b: Vec<Ray>,
}

impl RayQueues {
    pub fn new(capacity: u32) -> Self {
        Self {
            a: vec![Ray::default(); capacity as usize],
            b: vec![Ray::default(); capacity as usize],
        }
    }

    pub fn capacity(&self) -> u32 {
        self.a.len() as u32
    }

    pub fn get(&self, slot: QueueSlot) -> &[Ray] {
        match slot {
            QueueSlot::A => &self.a,
            QueueSlot::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, slot: QueueSlot) -> &mut [Ray] {
        match slot {
            QueueSlot::A => &mut self.a,
            QueueSlot::B => &mut self.b,
        }
    }

    /// Returns `(source, target)`, where target is the other queue.
    pub fn split(&mut self, source: QueueSlot) -> (&[Ray], &mut [Ray]) {
        match source {
            QueueSlot::A => (&self.a, &mut self.b),
            QueueSlot::B => (&self.b, &mut self.a),
        }
    }

    /// Like [`Self::split()`], but both halves are mutable.
    pub fn split_mut(
        &mut self,
        source: QueueSlot,
    ) -> (&mut [Ray], &mut [Ray]) {
        match source {
            QueueSlot::A => (&mut self.a, &mut self.b),
            QueueSlot::B => (&mut self.b, &mut self.a),
        }
    }
}

/// Append cursor of a queue, shared by all workgroups of a dispatch.
///
/// Workgroups reserve contiguous ranges with a single atomic increment and
/// then fill them in on their own, so the order in which ranges are handed
/// out (and thus the order of rays in the queue) is unspecified.
#[derive(Debug)]
pub struct AtomicCursor {
    value: AtomicU32,
    capacity: u32,
}

impl AtomicCursor {
    pub fn new(value: u32, capacity: u32) -> Self {
        Self {
            value: AtomicU32::new(value),
            capacity,
        }
    }

    pub fn reserve(&self, len: u32) -> Range<usize> {
        let start = self.value.fetch_add(len, Ordering::Relaxed);

        assert!(
            start + len <= self.capacity,
            "ray queue overflow: {} + {} > {}",
            start,
            len,
            self.capacity
        );

        (start as usize)..((start + len) as usize)
    }

    pub fn into_inner(self) -> u32 {
        self.value.into_inner()
    }
}
