mod buffers;
mod pass;
mod passes;

use std::mem;
use std::sync::{mpsc, Arc};

use bytemuck::Pod;
use log::{debug, info};

pub(crate) use self::buffers::*;
pub(crate) use self::pass::*;
pub(crate) use self::passes::*;
use crate::gpu::{self, DispatchHeader, PassFlags};
use crate::{
    Backend, Error, MappedUniformBuffer, Output, Result, Schedule, Shaders,
    StorageBuffer, Step, TracerLayout,
};

/// Bind group #0 of the `primary` and `bounce` kernels, usually holding the
/// scene (geometry, BVH, materials).
#[derive(Debug)]
pub struct Scene {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl Scene {
    /// Creates a scene without any bindings.
    pub fn empty(device: &wgpu::Device) -> Self {
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("wavefront_scene_layout"),
                entries: &[],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wavefront_scene"),
            layout: &layout,
            entries: &[],
        });

        Self { layout, bind_group }
    }
}

/// Backend recording schedules into `wgpu` command encoders.
///
/// The device must support [`wgpu::Features::PUSH_CONSTANTS`] with at least
/// 16 bytes of push constants.
///
/// Kernels are provided as WGSL source defining two entry points, both with
/// `@workgroup_size(64)`:
///
/// - `primary`, invoked once per pixel, which must either call
///   `wf_store_primary()` or `wf_retire()` for its pixel,
/// - `bounce`, invoked once per active ray (see `wf_ray_count()`), which
///   calls `wf_emit_ray()` to continue the path or `wf_retire()` to end it.
///
/// See `shaders/prelude.wgsl` for everything else kernels can use.
#[derive(Debug)]
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    shaders: Shaders,
    scene: Scene,
    camera: MappedUniformBuffer<gpu::Camera>,
    state: Option<DeviceState>,
    aov: bool,
}

#[derive(Debug)]
struct DeviceState {
    layout: TracerLayout,
    buffers: DeviceBuffers,
    passes: DevicePasses,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, kernels: &str) -> Self {
        let scene = Scene::empty(&device);

        Self::with_scene(device, kernels, scene)
    }

    pub fn with_scene(
        device: Arc<wgpu::Device>,
        kernels: &str,
        scene: Scene,
    ) -> Self {
        info!("Initializing backend");

        let shaders = Shaders::new(&device, kernels);
        let camera =
            MappedUniformBuffer::new_default(&device, "wavefront_camera");

        Self {
            device,
            shaders,
            scene,
            camera,
            state: None,
            aov: false,
        }
    }

    /// Replaces the scene; its layout must match the one given at
    /// construction time.
    pub fn set_scene(&mut self, bind_group: wgpu::BindGroup) {
        self.scene.bind_group = bind_group;
    }

    /// Uploads camera changes; must be called before submitting the
    /// recorded work.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.camera.flush(queue);
    }

    /// Reads the dispatch header back, waiting for the device to finish all
    /// of the submitted work.
    pub fn read_header(&self, queue: &wgpu::Queue) -> Result<DispatchHeader> {
        let state = self.state()?;
        let header = self.read(queue, &state.buffers.header, 1)?;

        Ok(header[0])
    }

    /// Reads the accumulation buffers back, waiting for the device to finish
    /// all of the submitted work.
    pub fn read_output(&self, queue: &wgpu::Queue) -> Result<Output> {
        let state = self.state()?;
        let header = self.read_header(queue)?;
        let pixels = state.layout.pixel_count as usize;

        let radiance = self.read(queue, &state.buffers.radiance, pixels)?;

        let (albedo, normal) = if self.aov {
            (
                Some(self.read(queue, &state.buffers.albedo, pixels)?),
                Some(self.read(queue, &state.buffers.normal, pixels)?),
            )
        } else {
            (None, None)
        };

        Ok(Output {
            size: state.layout.size,
            samples: header.accumulated_samples,
            radiance,
            albedo,
            normal,
        })
    }

    fn state(&self) -> Result<&DeviceState> {
        self.state
            .as_ref()
            .ok_or_else(|| Error::Readback("backend is not sized yet".into()))
    }

    fn read<T>(
        &self,
        queue: &wgpu::Queue,
        buffer: &StorageBuffer,
        len: usize,
    ) -> Result<Vec<T>>
    where
        T: Pod,
    {
        let size = (len * mem::size_of::<T>()) as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wavefront_staging"),
            usage: wgpu::BufferUsages::MAP_READ
                | wgpu::BufferUsages::COPY_DST,
            size,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("wavefront_readback"),
                });

        encoder.copy_buffer_to_buffer(buffer.buffer(), 0, &staging, 0, size);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| Error::Readback("mapping got cancelled".into()))?
            .map_err(|err| Error::Readback(err.to_string()))?;

        let data = slice
            .get_mapped_range()
            .chunks_exact(mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect();

        staging.unmap();

        Ok(data)
    }
}

impl Backend for WgpuBackend {
    type Encoder = wgpu::CommandEncoder;

    fn resize(&mut self, layout: &TracerLayout) {
        debug!("Resizing backend: {layout:?}");

        let buffers = DeviceBuffers::new(&self.device, layout);

        let passes = DevicePasses::new(
            &self.device,
            &self.shaders,
            &self.scene.layout,
            &self.camera,
            &buffers,
        );

        self.state = Some(DeviceState {
            layout: *layout,
            buffers,
            passes,
        });
    }

    fn set_camera(&mut self, camera: gpu::Camera) {
        *self.camera = camera;
    }

    fn run(&mut self, encoder: &mut Self::Encoder, schedule: &Schedule) {
        debug_assert_eq!(Ok(()), schedule.validate());

        let Some(DeviceState {
            layout,
            buffers,
            passes,
        }) = &self.state
        else {
            panic!("backend must be resized before running schedules");
        };

        let scene = &self.scene.bind_group;

        let sort = || {
            layout.sort.unwrap_or_else(|| {
                panic!("schedule sorts rays, but the layout has no sort")
            })
        };

        for step in schedule.steps() {
            match *step {
                Step::ResetAccumulation => {
                    encoder.clear_buffer(buffers.radiance.buffer(), 0, None);
                    encoder.clear_buffer(buffers.albedo.buffer(), 0, None);
                    encoder.clear_buffer(buffers.normal.buffer(), 0, None);

                    passes.header.reset_samples(encoder);
                }

                Step::BeginSample => {
                    passes.header.begin_sample(encoder, layout.pixel_count);
                }

                Step::GeneratePrimary(params) => {
                    passes.primary.run(encoder, scene, params);
                }

                Step::SortScanGroups { queue } => {
                    passes.sort.scan_groups(encoder, sort(), queue);
                }

                Step::SortScanSums => {
                    passes.sort.scan_sums(encoder, sort());
                }

                Step::SortScatter { queue } => {
                    passes.sort.scatter(encoder, sort(), queue);
                }

                Step::SortCopyBack { queue } => {
                    passes.sort.copy_back(encoder, sort(), queue);
                }

                Step::BeginBounce => {
                    passes.header.begin_bounce(encoder);

                    encoder.copy_buffer_to_buffer(
                        buffers.header.buffer(),
                        DispatchHeader::DISPATCH_OFFSET,
                        buffers.dispatch.buffer(),
                        0,
                        3 * mem::size_of::<u32>() as u64,
                    );
                }

                Step::TraceBounce { params, queue } => {
                    passes.bounce.run(
                        encoder,
                        scene,
                        buffers.dispatch.buffer(),
                        queue,
                        params,
                    );
                }

                Step::EndBounce => {
                    passes.header.end_bounce(encoder);
                }

                Step::Accumulate(params) => {
                    passes.accumulation.run(encoder, params);

                    self.aov = params.flags & PassFlags::AOV != 0;
                }

                Step::EndSample => {
                    passes.header.end_sample(encoder);
                }

                // wgpu inserts barriers between compute passes on its own
                Step::Barrier => {}
            }
        }
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        info!("Releasing backend");
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use glam::Vec4;

    use crate::gpu::{DispatchHeader, PixelSample, Ray};

    #[test]
    fn buffer_strides() {
        assert_eq!(48, mem::size_of::<Ray>());
        assert_eq!(48, mem::size_of::<PixelSample>());
        assert_eq!(32, mem::size_of::<DispatchHeader>());
        assert_eq!(16, mem::size_of::<Vec4>());
    }
}
