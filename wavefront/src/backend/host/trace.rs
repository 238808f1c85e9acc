use crate::QueueSlot;

/// What [`crate::HostBackend`] observed while executing a sample.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleTrace {
    /// Rays written into queue A by the primary generation (including the
    /// already-terminated ones).
    pub primary_rays: u32,

    pub bounces: Vec<BounceTrace>,

    /// Paths retired by kernels before the accumulation.
    pub terminated: u32,

    /// Paths still alive when the accumulation ran.
    pub forced: u32,

    /// Pixels folded into the accumulation buffers.
    pub contributions: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BounceTrace {
    pub bounce: u32,
    pub source: QueueSlot,

    /// Number of workgroups launched by the indirect dispatch.
    pub groups: u32,

    pub active_before: u32,
    pub active_after: u32,

    /// Value of the header's `ping_pong` after this bounce.
    pub ping_pong: u32,

    pub sort: Option<SortTrace>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortTrace {
    pub active: u32,

    /// Number of sorted rays per bucket.
    pub bucket_counts: Vec<u32>,

    /// Whether every bucket ended up as a single contiguous run.
    pub contiguous: bool,
}
