use crate::gpu::{self, SortLayout};
use crate::{
    ComputePass, DeviceBuffers, MappedUniformBuffer, QueueSlot, Shaders,
    Workgroups,
};

/// Coherency sort of the source queue; see `sort.wgsl`.
#[derive(Debug)]
pub struct SortPass {
    scan_groups: ComputePass<SortLayout>,
    scan_sums: ComputePass<SortLayout>,
    scatter: ComputePass<SortLayout>,
    copy_back: ComputePass<SortLayout>,
}

impl SortPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &wgpu::BindGroupLayout,
        _: &MappedUniformBuffer<gpu::Camera>,
        buffers: &DeviceBuffers,
    ) -> Self {
        let pass = |entry_point| {
            ComputePass::builder(format!("sort_{entry_point}"))
                .bind([
                    &buffers.header.bind_writable(),
                    &buffers.queues.curr().bind_writable(),
                    &buffers.queues.past().bind_writable(),
                    &buffers.sort_ranks.bind_writable(),
                    &buffers.sort_table.bind_writable(),
                ])
                .build(device, (&shaders.sort, entry_point))
        };

        Self {
            scan_groups: pass("scan_groups"),
            scan_sums: pass("scan_sums"),
            scatter: pass("scatter"),
            copy_back: pass("copy_back"),
        }
    }

    pub fn scan_groups(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        layout: SortLayout,
        queue: QueueSlot,
    ) {
        Self::run(
            &self.scan_groups,
            encoder,
            layout,
            queue,
            layout.group_count,
        );
    }

    pub fn scan_sums(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        layout: SortLayout,
    ) {
        // The table doesn't depend on the queue, any variant will do
        Self::run(&self.scan_sums, encoder, layout, QueueSlot::A, 1);
    }

    pub fn scatter(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        layout: SortLayout,
        queue: QueueSlot,
    ) {
        Self::run(
            &self.scatter,
            encoder,
            layout,
            queue,
            layout.group_count,
        );
    }

    pub fn copy_back(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        layout: SortLayout,
        queue: QueueSlot,
    ) {
        Self::run(
            &self.copy_back,
            encoder,
            layout,
            queue,
            layout.group_count,
        );
    }

    fn run(
        pass: &ComputePass<SortLayout>,
        encoder: &mut wgpu::CommandEncoder,
        layout: SortLayout,
        queue: QueueSlot,
        workgroups: u32,
    ) {
        pass.run(
            encoder,
            None,
            queue == QueueSlot::B,
            Workgroups::Direct(workgroups),
            layout,
        );
    }
}
