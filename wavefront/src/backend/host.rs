mod kernels;
mod queues;
mod sort;
mod trace;

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use derivative::Derivative;
use glam::{UVec2, Vec4};
use log::{debug, trace};
use rayon::prelude::*;

pub use self::kernels::*;
pub use self::queues::*;
pub use self::sort::*;
pub use self::trace::*;
use crate::gpu::{
    self, workgroups_for, AccumulatePassParams, DispatchHeader, PassFlags,
    PixelSample, Ray, RayPassParams, RAY_WORKGROUP_SIZE,
};
use crate::{Backend, Output, QueueSlot, Schedule, Step, TracerLayout};

/// Device emulated on the CPU.
///
/// Executes schedules step by step, running kernels across `rayon`'s thread
/// pool; each workgroup of a bounce dispatch reserves room in the target queue
/// with an atomic increment, so the order of rays in queues is unspecified
/// (just like on a GPU).
///
/// Writes of a dispatch become visible once the dispatch completes, which
/// makes every step boundary a barrier; the schedule's barriers are still
/// validated.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct HostBackend<K> {
    #[derivative(Debug = "ignore")]
    kernels: K,
    camera: gpu::Camera,
    size: UVec2,
    header: DispatchHeader,
    #[derivative(Debug = "ignore")]
    queues: RayQueues,
    #[derivative(Debug = "ignore")]
    sorter: Option<HostSorter>,
    #[derivative(Debug = "ignore")]
    samples: Vec<PixelSample>,
    #[derivative(Debug = "ignore")]
    radiance: Vec<Vec4>,
    #[derivative(Debug = "ignore")]
    albedo: Vec<Vec4>,
    #[derivative(Debug = "ignore")]
    normal: Vec<Vec4>,
    aov: bool,
    #[derivative(Debug = "ignore")]
    traces: Vec<SampleTrace>,
    pending_sort: Option<SortTrace>,
}

impl<K> HostBackend<K>
where
    K: HostKernels,
{
    pub fn new(kernels: K) -> Self {
        Self {
            kernels,
            camera: Default::default(),
            size: Default::default(),
            header: Default::default(),
            queues: Default::default(),
            sorter: None,
            samples: Default::default(),
            radiance: Default::default(),
            albedo: Default::default(),
            normal: Default::default(),
            aov: false,
            traces: Default::default(),
            pending_sort: None,
        }
    }

    pub fn kernels(&self) -> &K {
        &self.kernels
    }

    pub fn kernels_mut(&mut self) -> &mut K {
        &mut self.kernels
    }

    pub fn camera(&self) -> &gpu::Camera {
        &self.camera
    }

    pub fn header(&self) -> &DispatchHeader {
        &self.header
    }

    /// Returns the entire queue, including slots past its active count.
    pub fn queue(&self, slot: QueueSlot) -> &[Ray] {
        self.queues.get(slot)
    }

    /// Returns rays the header considers active in given queue.
    pub fn active_rays(&self, slot: QueueSlot) -> &[Ray] {
        let len = self.header.active_ray_count[slot.index()] as usize;

        &self.queues.get(slot)[..len]
    }

    /// Returns what has been observed for each of the samples executed so far.
    pub fn traces(&self) -> &[SampleTrace] {
        &self.traces
    }

    pub fn take_traces(&mut self) -> Vec<SampleTrace> {
        std::mem::take(&mut self.traces)
    }

    pub fn output(&self) -> Output {
        Output {
            size: self.size,
            samples: self.header.accumulated_samples,
            radiance: self.radiance.clone(),
            albedo: self.aov.then(|| self.albedo.clone()),
            normal: self.aov.then(|| self.normal.clone()),
        }
    }

    fn execute(&mut self, step: Step) {
        trace!("Executing: {step:?}");

        match step {
            Step::ResetAccumulation => {
                self.radiance.fill(Vec4::ZERO);
                self.albedo.fill(Vec4::ZERO);
                self.normal.fill(Vec4::ZERO);
                self.header.reset();
            }

            Step::BeginSample => {
                self.header.begin_sample(self.samples.len() as u32);
                self.traces.push(Default::default());
            }

            Step::GeneratePrimary(params) => {
                self.generate(params);
            }

            Step::SortScanGroups { queue } => {
                let active = self.header.active_ray_count[queue.index()];
                let Some(sorter) = &mut self.sorter else {
                    panic!("tracer has no sort layout");
                };

                sorter.scan_groups(self.queues.get(queue), active);
            }

            Step::SortScanSums => {
                let active = self.header.active_rays();
                let Some(sorter) = &mut self.sorter else {
                    panic!("tracer has no sort layout");
                };

                assert_eq!(active, sorter.scan_sums(), "sort lost some rays");
            }

            Step::SortScatter { queue } => {
                let active = self.header.active_ray_count[queue.index()];
                let Some(sorter) = &self.sorter else {
                    panic!("tracer has no sort layout");
                };
                let (src, dst) = self.queues.split(queue);

                sorter.scatter(src, active, dst);
            }

            Step::SortCopyBack { queue } => {
                let active = self.header.active_ray_count[queue.index()];
                let Some(sorter) = &self.sorter else {
                    panic!("tracer has no sort layout");
                };
                let (dst, src) = self.queues.split_mut(queue);

                dst[..active as usize].copy_from_slice(&src[..active as usize]);

                self.pending_sort = Some(SortTrace {
                    active,
                    bucket_counts: sorter.bucket_counts(dst, active),
                    contiguous: sorter.is_partitioned(dst, active),
                });
            }

            Step::BeginBounce => {
                self.header.begin_bounce();
            }

            Step::TraceBounce { params, queue } => {
                self.bounce(params, queue);
            }

            Step::EndBounce => {
                self.header.end_bounce();

                if let Some(bounce) = self
                    .traces
                    .last_mut()
                    .and_then(|trace| trace.bounces.last_mut())
                {
                    bounce.ping_pong = self.header.ping_pong;
                }
            }

            Step::Accumulate(params) => {
                self.accumulate(params);
            }

            Step::EndSample => {
                self.header.end_sample();

                if let Some(trace) = self.traces.last_mut() {
                    trace.terminated = self.header.terminated_rays;
                }
            }

            Step::Barrier => {}
        }
    }

    fn generate(&mut self, params: RayPassParams) {
        assert_eq!(
            self.samples.len(),
            params.pixel_count as usize,
            "primary generation must cover the entire grid"
        );

        let ctxt = KernelContext {
            camera: &self.camera,
            params,
        };

        let kernels = &self.kernels;
        let aov = params.has(PassFlags::AOV);

        let terminated: u32 = self
            .queues
            .get_mut(QueueSlot::A)
            .par_iter_mut()
            .zip(&mut self.samples)
            .enumerate()
            .map(|(pixel, (slot, sample))| {
                let pixel = pixel as u32;
                let shading = kernels.generate(&ctxt, pixel);

                apply(sample, &shading, aov);

                // Missed rays keep their slot, so that the queue still holds
                // exactly one ray per pixel
                *slot = match shading.next {
                    Some(ray) => {
                        assert_eq!(pixel, ray.pixel, "ray changed its pixel");
                        ray
                    }
                    None => Ray::terminated(pixel),
                };

                shading.next.is_none() as u32
            })
            .sum();

        self.header.terminated_rays += terminated;

        if let Some(trace) = self.traces.last_mut() {
            trace.primary_rays = self.header.active_ray_count[0];
        }
    }

    fn bounce(&mut self, params: RayPassParams, source: QueueSlot) {
        assert_eq!(
            source.index(),
            self.header.source(),
            "bounce reads from a queue which is not the current source"
        );

        let target = source.other();
        let active = self.header.active_ray_count[source.index()];
        let groups = self.header.dispatch[0];

        assert_eq!(
            workgroups_for(active, RAY_WORKGROUP_SIZE),
            groups,
            "indirect dispatch doesn't match the active ray count"
        );

        let ctxt = KernelContext {
            camera: &self.camera,
            params,
        };

        let kernels = &self.kernels;
        let aov = params.has(PassFlags::AOV);
        let capacity = self.queues.capacity();
        let (src, dst) = self.queues.split(source);

        let cursor = AtomicCursor::new(
            self.header.active_ray_count[target.index()],
            capacity,
        );

        let terminated = AtomicU32::new(0);

        let outputs: Vec<GroupOutput> = (0..groups)
            .into_par_iter()
            .map(|group| {
                let mut emitted = Vec::new();
                let mut shadings = Vec::new();

                for local_idx in 0..RAY_WORKGROUP_SIZE {
                    let idx = group * RAY_WORKGROUP_SIZE + local_idx;

                    if idx >= active {
                        break;
                    }

                    let ray = &src[idx as usize];

                    if ray.is_terminated() {
                        continue;
                    }

                    let shading = kernels.bounce(&ctxt, ray);

                    if let Some(next) = shading.next {
                        assert_eq!(ray.pixel, next.pixel, "ray changed its pixel");
                        emitted.push(next);
                    } else {
                        terminated.fetch_add(1, Ordering::Relaxed);
                    }

                    shadings.push((ray.pixel, shading));
                }

                let slots = cursor.reserve(emitted.len() as u32);

                GroupOutput {
                    slots,
                    emitted,
                    shadings,
                }
            })
            .collect();

        for output in outputs {
            dst[output.slots].copy_from_slice(&output.emitted);

            for (pixel, shading) in output.shadings {
                apply(&mut self.samples[pixel as usize], &shading, aov);
            }
        }

        let active_after = cursor.into_inner();

        self.header.active_ray_count[target.index()] = active_after;
        self.header.terminated_rays += terminated.into_inner();

        if let Some(trace) = self.traces.last_mut() {
            trace.bounces.push(BounceTrace {
                bounce: params.bounce,
                source,
                groups,
                active_before: active,
                active_after,
                ping_pong: self.header.ping_pong,
                sort: self.pending_sort.take(),
            });
        }
    }

    fn accumulate(&mut self, params: AccumulatePassParams) {
        assert_eq!(self.samples.len(), params.pixel_count as usize);

        self.aov = params.flags & PassFlags::AOV != 0;

        // Paths which are still in the source queue never got retired by a
        // kernel; they get folded in together with everything else
        let forced = self
            .active_rays(QueueSlot::from_index(self.header.source()))
            .iter()
            .filter(|ray| !ray.is_terminated())
            .count() as u32;

        let pixels = params.pixel_count as usize;

        let contributions = if self.aov {
            (
                &mut self.samples[..pixels],
                &mut self.radiance[..pixels],
                &mut self.albedo[..pixels],
                &mut self.normal[..pixels],
            )
                .into_par_iter()
                .map(|(sample, radiance, albedo, normal)| {
                    sample.accumulate(radiance, Some((albedo, normal)));
                    *sample = Default::default();
                    1u32
                })
                .sum::<u32>()
        } else {
            self.samples[..pixels]
                .par_iter_mut()
                .zip(&mut self.radiance[..pixels])
                .map(|(sample, radiance)| {
                    sample.accumulate(radiance, None);
                    *sample = Default::default();
                    1u32
                })
                .sum::<u32>()
        };

        if let Some(trace) = self.traces.last_mut() {
            trace.forced = forced;
            trace.contributions = contributions;
        }
    }
}

impl<K> Backend for HostBackend<K>
where
    K: HostKernels,
{
    type Encoder = ();

    fn resize(&mut self, layout: &TracerLayout) {
        debug!(
            "Resizing host device: {}x{}, sort={:?}",
            layout.size.x, layout.size.y, layout.sort
        );

        let len = layout.pixel_count as usize;

        self.size = layout.size;
        self.header = Default::default();
        self.queues = RayQueues::new(layout.queue_capacity());
        self.sorter = layout.sort.map(HostSorter::new);
        self.samples = vec![Default::default(); len];
        self.radiance = vec![Vec4::ZERO; len];
        self.albedo = vec![Vec4::ZERO; len];
        self.normal = vec![Vec4::ZERO; len];
        self.pending_sort = None;
    }

    fn set_camera(&mut self, camera: gpu::Camera) {
        self.camera = camera;
    }

    fn run(&mut self, _: &mut (), schedule: &Schedule) {
        if let Err(hazard) = schedule.validate() {
            panic!("{hazard}");
        }

        for step in schedule.steps() {
            self.execute(*step);
        }
    }
}

struct GroupOutput {
    slots: Range<usize>,
    emitted: Vec<Ray>,
    shadings: Vec<(u32, Shading)>,
}

fn apply(sample: &mut PixelSample, shading: &Shading, aov: bool) {
    sample.add_radiance(shading.radiance);

    if aov {
        if let Some((albedo, normal)) = shading.aov {
            sample.write_aov(albedo, normal);
        }
    }
}
