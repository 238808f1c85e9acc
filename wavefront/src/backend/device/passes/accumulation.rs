use crate::gpu::{self, AccumulatePassParams, RAY_WORKGROUP_SIZE};
use crate::{
    ComputePass, DeviceBuffers, MappedUniformBuffer, Shaders, Workgroups,
};

#[derive(Debug)]
pub struct AccumulationPass {
    pass: ComputePass<AccumulatePassParams>,
}

impl AccumulationPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &wgpu::BindGroupLayout,
        _: &MappedUniformBuffer<gpu::Camera>,
        buffers: &DeviceBuffers,
    ) -> Self {
        let pass = ComputePass::builder("accumulation")
            .bind([
                &buffers.samples.bind_writable(),
                &buffers.radiance.bind_writable(),
                &buffers.albedo.bind_writable(),
                &buffers.normal.bind_writable(),
            ])
            .build(device, (&shaders.accumulate, "accumulate"));

        Self { pass }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: AccumulatePassParams,
    ) {
        let workgroups =
            gpu::workgroups_for(params.pixel_count, RAY_WORKGROUP_SIZE);

        self.pass.run(
            encoder,
            None,
            false,
            Workgroups::Direct(workgroups),
            params,
        );
    }
}
