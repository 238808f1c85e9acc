mod device;
mod host;

pub use self::device::*;
pub use self::host::*;
use crate::{gpu, Schedule, TracerLayout};

/// Something that can execute schedules recorded by [`crate::Tracer`].
pub trait Backend {
    /// Where dispatches get recorded into (e.g. `wgpu::CommandEncoder`).
    type Encoder;

    /// (Re)allocates queues, header, sort tables and output buffers for given
    /// layout; destroys whatever was accumulated so far.
    fn resize(&mut self, layout: &TracerLayout);

    fn set_camera(&mut self, camera: gpu::Camera);

    /// Records given schedule.
    ///
    /// Steps must be executed in order, with [`crate::Step::Barrier`] making
    /// writes of all of the preceding steps visible to the following ones.
    fn run(&mut self, encoder: &mut Self::Encoder, schedule: &Schedule);
}
