//! Common structs, algorithms etc. shared by the wavefront tracer's kernels
//! and its host-side orchestration.
//!
//! Everything here has a twin in `wavefront/src/shaders/*.wgsl`; the layouts
//! must stay byte-compatible with those declarations.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod camera;
mod header;
mod noise;
mod passes;
mod ray;
mod sample;
mod scan;
mod sort;

pub use self::camera::*;
pub use self::header::*;
pub use self::noise::*;
pub use self::passes::*;
pub use self::ray::*;
pub use self::sample::*;
pub use self::scan::*;
pub use self::sort::*;

/// Number of invocations per workgroup for kernels that process one ray (or
/// one pixel) per invocation.
///
/// Indirect dispatches are sized in multiples of this, so kernels must
/// bounds-check their invocation index against the active ray count.
pub const RAY_WORKGROUP_SIZE: u32 = 64;

/// Returns how many workgroups of `group_size` invocations cover `items`.
pub fn workgroups_for(items: u32, group_size: u32) -> u32 {
    items.div_ceil(group_size)
}

/// Maximum number of workgroups a one-dimensional dispatch may launch
/// (`max_compute_workgroups_per_dimension` of default device limits).
pub const MAX_DISPATCH_GROUPS: u32 = 65535;

/// Maximum number of pixels a tracer can handle; queues are processed with
/// one-dimensional dispatches of [`RAY_WORKGROUP_SIZE`]-wide workgroups.
pub const MAX_PIXELS: u32 = MAX_DISPATCH_GROUPS * RAY_WORKGROUP_SIZE;
