use std::marker::PhantomData;
use std::mem;
use std::ops::Range;

use bytemuck::Pod;
use log::debug;

use crate::{BindGroup, BindGroupBuilder, DoubleBufferedBindable, ShaderEntry};

/// Number of workgroups to launch.
#[derive(Clone, Copy, Debug)]
pub enum Workgroups<'a> {
    Direct(u32),

    /// Read from given buffer at given offset, as `[x, y, z]`.
    Indirect(&'a wgpu::Buffer, u64),
}

#[derive(Debug)]
pub struct ComputePass<P> {
    label: String,
    has_scene: bool,
    bind_groups: Vec<BindGroup>,
    pipeline: wgpu::ComputePipeline,
    _params: PhantomData<P>,
}

impl<P> ComputePass<P>
where
    P: Pod,
{
    pub fn builder<'a>(label: impl ToString) -> ComputePassBuilder<'a, P> {
        ComputePassBuilder {
            label: label.to_string(),
            scene: None,
            bind_groups: Default::default(),
            _params: Default::default(),
        }
    }

    /// Records this pass; `alternate` selects the `B` variant of bind groups
    /// (i.e. queue B being the source).
    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: Option<&wgpu::BindGroup>,
        alternate: bool,
        workgroups: Workgroups,
        params: P,
    ) {
        assert_eq!(
            self.has_scene,
            scene.is_some(),
            "pass `{}` got mismatched scene",
            self.label
        );

        let label = format!("wavefront_{}_pass", self.label);

        let mut pass =
            encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&label),
                timestamp_writes: None,
            });

        pass.set_pipeline(&self.pipeline);

        if mem::size_of::<P>() > 0 {
            pass.set_push_constants(0, bytemuck::bytes_of(&params));
        }

        let mut bind_group_idx = 0;

        if let Some(scene) = scene {
            pass.set_bind_group(0, scene, &[]);
            bind_group_idx += 1;
        }

        for bind_group in &self.bind_groups {
            pass.set_bind_group(bind_group_idx, bind_group.get(alternate), &[]);
            bind_group_idx += 1;
        }

        match workgroups {
            Workgroups::Direct(count) => {
                pass.dispatch_workgroups(count, 1, 1);
            }
            Workgroups::Indirect(buffer, offset) => {
                pass.dispatch_workgroups_indirect(buffer, offset);
            }
        }
    }
}

pub struct ComputePassBuilder<'a, P> {
    label: String,
    scene: Option<&'a wgpu::BindGroupLayout>,
    bind_groups: Vec<BindGroupBuilder<'a>>,
    _params: PhantomData<P>,
}

impl<'a, P> ComputePassBuilder<'a, P>
where
    P: Pod,
{
    /// Reserves bind group #0 for the externally-provided scene.
    pub fn scene(mut self, layout: &'a wgpu::BindGroupLayout) -> Self {
        self.scene = Some(layout);
        self
    }

    pub fn bind<const N: usize>(
        mut self,
        items: [&'a dyn DoubleBufferedBindable; N],
    ) -> Self {
        let mut bind_group = BindGroup::builder(format!(
            "{}_bg{}",
            self.label,
            self.bind_groups.len()
        ));

        for item in items {
            bind_group = bind_group.add(item);
        }

        self.bind_groups.push(bind_group);
        self
    }

    pub fn build(
        self,
        device: &wgpu::Device,
        (module, entry_point): ShaderEntry,
    ) -> ComputePass<P> {
        debug!("Initializing pass: {}:{}", self.label, entry_point);

        let bind_groups: Vec<_> = self
            .bind_groups
            .into_iter()
            .map(|bg| bg.build(device))
            .collect();

        let bind_group_layouts: Vec<_> = self
            .scene
            .into_iter()
            .chain(bind_groups.iter().map(|bg| bg.layout()))
            .collect();

        let push_constant_ranges = if mem::size_of::<P>() > 0 {
            vec![wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: Range {
                    start: 0,
                    end: mem::size_of::<P>() as u32,
                },
            }]
        } else {
            vec![]
        };

        let pipeline_layout_label =
            format!("wavefront_{}_pipeline_layout", self.label);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&pipeline_layout_label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &push_constant_ranges,
            });

        let pipeline_label = format!("wavefront_{}_pipeline", self.label);

        let pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&pipeline_label),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        ComputePass {
            label: self.label,
            has_scene: self.scene.is_some(),
            bind_groups,
            pipeline,
            _params: PhantomData,
        }
    }
}
