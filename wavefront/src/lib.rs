//! Wavefront path-tracing core: traces every pixel's path in lockstep,
//! bounce by bounce, keeping surviving rays in a pair of self-compacting
//! queues whose sizes never leave the device.
//!
//! The [`Tracer`] records, for each sample, an ordered [`Schedule`] of
//! dispatches which is then executed by a [`Backend`]:
//!
//! - [`WgpuBackend`] runs it on a GPU, using indirect dispatches sized by the
//!   device-resident [`gpu::DispatchHeader`],
//! - [`HostBackend`] emulates the device on the CPU (with `rayon` standing in
//!   for workgroups), which is handy for testing kernels and the scheduler.

#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]

mod backend;
mod buffers;
mod config;
mod error;
mod layout;
mod output;
mod schedule;
mod shaders;
mod tracer;
mod utils;

pub use wavefront_gpu as gpu;

pub use self::backend::*;
pub(crate) use self::buffers::*;
pub use self::config::*;
pub use self::error::*;
pub use self::layout::*;
pub use self::output::*;
pub use self::schedule::*;
pub(crate) use self::shaders::*;
pub use self::tracer::*;
pub(crate) use self::utils::*;
