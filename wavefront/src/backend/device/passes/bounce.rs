use crate::gpu::{self, RayPassParams};
use crate::{
    ComputePass, DeviceBuffers, MappedUniformBuffer, QueueSlot, Shaders,
    Workgroups,
};

#[derive(Debug)]
pub struct BouncePass {
    pass: ComputePass<RayPassParams>,
}

impl BouncePass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        scene: &wgpu::BindGroupLayout,
        camera: &MappedUniformBuffer<gpu::Camera>,
        buffers: &DeviceBuffers,
    ) -> Self {
        let pass = ComputePass::builder("bounce")
            .scene(scene)
            .bind([
                &buffers.header.bind_writable(),
                &camera.bind_readable(),
                &buffers.queues.curr().bind_readable(),
                &buffers.queues.past().bind_writable(),
                &buffers.samples.bind_writable(),
            ])
            .build(device, (&shaders.kernels, "bounce"));

        Self { pass }
    }

    /// Consumes the `source` queue, appending survivors into the other one;
    /// the number of workgroups comes from `dispatch`.
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &wgpu::BindGroup,
        dispatch: &wgpu::Buffer,
        source: QueueSlot,
        params: RayPassParams,
    ) {
        self.pass.run(
            encoder,
            Some(scene),
            source == QueueSlot::B,
            Workgroups::Indirect(dispatch, 0),
            params,
        );
    }
}
