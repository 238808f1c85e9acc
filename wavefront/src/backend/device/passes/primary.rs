use crate::gpu::{self, RayPassParams, RAY_WORKGROUP_SIZE};
use crate::{
    ComputePass, DeviceBuffers, MappedUniformBuffer, Shaders, Workgroups,
};

#[derive(Debug)]
pub struct PrimaryPass {
    pass: ComputePass<RayPassParams>,
}

impl PrimaryPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        scene: &wgpu::BindGroupLayout,
        camera: &MappedUniformBuffer<gpu::Camera>,
        buffers: &DeviceBuffers,
    ) -> Self {
        let pass = ComputePass::builder("primary")
            .scene(scene)
            .bind([
                &buffers.header.bind_writable(),
                &camera.bind_readable(),
                &buffers.queues.curr().bind_readable(),
                &buffers.queues.past().bind_writable(),
                &buffers.samples.bind_writable(),
            ])
            .build(device, (&shaders.kernels, "primary"));

        Self { pass }
    }

    /// Fills queue A with one ray per pixel.
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &wgpu::BindGroup,
        params: RayPassParams,
    ) {
        let workgroups =
            gpu::workgroups_for(params.pixel_count, RAY_WORKGROUP_SIZE);

        // Variant `B` binds queue A as the target
        self.pass.run(
            encoder,
            Some(scene),
            true,
            Workgroups::Direct(workgroups),
            params,
        );
    }
}
