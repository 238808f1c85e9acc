use crate::gpu::{self, RayPassParams};
use crate::{
    ComputePass, DeviceBuffers, MappedUniformBuffer, Shaders, Workgroups,
};

/// Single-invocation kernels maintaining the dispatch header.
#[derive(Debug)]
pub struct HeaderPass {
    begin_sample: ComputePass<RayPassParams>,
    begin_bounce: ComputePass<RayPassParams>,
    end_bounce: ComputePass<RayPassParams>,
    end_sample: ComputePass<RayPassParams>,
    reset_samples: ComputePass<RayPassParams>,
}

impl HeaderPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &wgpu::BindGroupLayout,
        _: &MappedUniformBuffer<gpu::Camera>,
        buffers: &DeviceBuffers,
    ) -> Self {
        let pass = |entry_point| {
            ComputePass::builder(format!("header_{entry_point}"))
                .bind([&buffers.header.bind_writable()])
                .build(device, (&shaders.header, entry_point))
        };

        Self {
            begin_sample: pass("begin_sample"),
            begin_bounce: pass("begin_bounce"),
            end_bounce: pass("end_bounce"),
            end_sample: pass("end_sample"),
            reset_samples: pass("reset_samples"),
        }
    }

    pub fn begin_sample(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pixel_count: u32,
    ) {
        let params = RayPassParams {
            pixel_count,
            ..Default::default()
        };

        Self::run(&self.begin_sample, encoder, params);
    }

    pub fn begin_bounce(&self, encoder: &mut wgpu::CommandEncoder) {
        Self::run(&self.begin_bounce, encoder, Default::default());
    }

    pub fn end_bounce(&self, encoder: &mut wgpu::CommandEncoder) {
        Self::run(&self.end_bounce, encoder, Default::default());
    }

    pub fn end_sample(&self, encoder: &mut wgpu::CommandEncoder) {
        Self::run(&self.end_sample, encoder, Default::default());
    }

    pub fn reset_samples(&self, encoder: &mut wgpu::CommandEncoder) {
        Self::run(&self.reset_samples, encoder, Default::default());
    }

    fn run(
        pass: &ComputePass<RayPassParams>,
        encoder: &mut wgpu::CommandEncoder,
        params: RayPassParams,
    ) {
        pass.run(encoder, None, false, Workgroups::Direct(1), params);
    }
}
