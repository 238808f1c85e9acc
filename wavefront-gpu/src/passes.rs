use bytemuck::{Pod, Zeroable};

/// Push constants of ray kernels (primary generation and bounces).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RayPassParams {
    pub seed: u32,

    /// 0 for primary rays, `1..ray_depth` for bounces.
    pub bounce: u32,

    /// See [`PassFlags`].
    pub flags: u32,

    pub pixel_count: u32,
}

impl RayPassParams {
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Returns whether rays emitted by this pass will never be traced; kernels
    /// should retire paths instead of emitting them.
    pub fn is_last_bounce(&self) -> bool {
        self.has(PassFlags::LAST_BOUNCE)
    }
}

/// Push constants of the accumulation kernel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct AccumulatePassParams {
    pub flags: u32,
    pub pixel_count: u32,
    pub _pad: [u32; 2],
}

/// Bits of [`RayPassParams::flags`] and [`AccumulatePassParams::flags`].
pub struct PassFlags;

impl PassFlags {
    pub const LIGHT_TRACING: u32 = 1;
    pub const RUSSIAN_ROULETTE: u32 = 1 << 1;
    pub const AOV: u32 = 1 << 2;
    pub const BVH_TRAVERSAL: u32 = 1 << 3;
    pub const LAST_BOUNCE: u32 = 1 << 4;
}
