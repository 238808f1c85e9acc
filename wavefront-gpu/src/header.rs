use bytemuck::{Pod, Zeroable};

use crate::{workgroups_for, RAY_WORKGROUP_SIZE};

/// Device-resident bookkeeping of the wavefront loop.
///
/// There's exactly one header per tracer; apart from the atomic increments of
/// `active_ray_count[_]` and `terminated_rays` performed by ray kernels, it's
/// mutated only by single-invocation header kernels (see the methods below),
/// each separated from its neighbours by a barrier.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchHeader {
    /// Number of rays stored in ray queue A (`[0]`) and B (`[1]`).
    pub active_ray_count: [u32; 2],

    /// Which queue is currently being read from; the other one is the write
    /// target.
    pub ping_pong: u32,

    /// Number of samples folded into the accumulation buffers since the last
    /// reset.
    pub accumulated_samples: u32,

    /// Arguments for `dispatch_workgroups_indirect()` of the next ray kernel.
    pub dispatch: [u32; 3],

    /// Number of paths retired before the final accumulation in the current
    /// sample.
    pub terminated_rays: u32,
}

impl DispatchHeader {
    /// Byte offset of [`Self::dispatch`], as consumed by indirect dispatches.
    pub const DISPATCH_OFFSET: u64 = 16;

    /// Returns the index of the queue rays are read from.
    pub fn source(&self) -> usize {
        (self.ping_pong & 1) as usize
    }

    /// Returns the index of the queue surviving rays are appended into.
    pub fn target(&self) -> usize {
        1 - self.source()
    }

    /// Returns the number of rays in the queue being read from.
    pub fn active_rays(&self) -> u32 {
        self.active_ray_count[self.source()]
    }

    /// Prepares the header for primary-ray generation: queue A holds one ray
    /// per pixel, queue B is empty.
    pub fn begin_sample(&mut self, pixel_count: u32) {
        self.active_ray_count = [pixel_count, 0];
        self.ping_pong = 0;
        self.terminated_rays = 0;
        self.dispatch = [workgroups_for(pixel_count, RAY_WORKGROUP_SIZE), 1, 1];
    }

    /// Prepares the header for a bounce: clears the target queue and sizes
    /// the indirect dispatch after the source queue.
    pub fn begin_bounce(&mut self) {
        let target = self.target();

        self.active_ray_count[target] = 0;

        self.dispatch = [
            workgroups_for(self.active_rays(), RAY_WORKGROUP_SIZE),
            1,
            1,
        ];
    }

    /// Finishes a bounce: the queue just written becomes the source.
    pub fn end_bounce(&mut self) {
        self.ping_pong = self.target() as u32;
    }

    /// Finishes a sample, after all of its paths have been accumulated.
    pub fn end_sample(&mut self) {
        self.accumulated_samples += 1;
    }

    /// Forgets accumulated samples; issued together with clearing the
    /// accumulation buffers.
    pub fn reset(&mut self) {
        self.accumulated_samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn layout() {
        assert_eq!(32, mem::size_of::<DispatchHeader>());

        let header = DispatchHeader {
            dispatch: [0xcafe, 1, 1],
            ..Default::default()
        };

        let bytes = bytemuck::bytes_of(&header);
        let offset = DispatchHeader::DISPATCH_OFFSET as usize;

        assert_eq!(
            0xcafe,
            u32::from_le_bytes(bytes[offset..][..4].try_into().unwrap())
        );
    }

    #[test]
    fn bounces() {
        let mut target = DispatchHeader::default();

        target.begin_sample(4096);

        assert_eq!([4096, 0], target.active_ray_count);
        assert_eq!(0, target.source());
        assert_eq!(64, target.dispatch[0]);

        // Pretend a kernel appended 2000 rays into B
        target.begin_bounce();
        target.active_ray_count[1] = 2000;
        target.end_bounce();

        assert_eq!(1, target.ping_pong);
        assert_eq!(2000, target.active_rays());

        // Stale rays in A must be forgotten before the next bounce
        target.active_ray_count[0] = 1234;
        target.begin_bounce();

        assert_eq!([0, 2000], target.active_ray_count);
        assert_eq!(32, target.dispatch[0]);
    }

    #[test]
    fn empty_bounce_dispatches_nothing() {
        let mut target = DispatchHeader::default();

        target.begin_sample(100);
        target.active_ray_count[0] = 0;
        target.begin_bounce();

        assert_eq!([0, 1, 1], target.dispatch);
    }

    #[test]
    fn samples() {
        let mut target = DispatchHeader::default();

        for _ in 0..3 {
            target.begin_sample(16);
            target.end_sample();
        }

        assert_eq!(3, target.accumulated_samples);

        target.reset();

        assert_eq!(0, target.accumulated_samples);
    }
}
