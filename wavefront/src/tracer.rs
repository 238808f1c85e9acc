use std::mem;

use derivative::Derivative;
use glam::{uvec2, UVec2};
use log::{debug, info, trace};
use rand::Rng;

use crate::{
    measure, Backend, Result, Schedule, TracerConfig, TracerLayout,
    WgpuBackend,
};

/// Wavefront scheduler: records samples into its backend.
///
/// The tracer never waits for the device; everything it knows about the
/// device's state (e.g. [`Self::accumulated_sample_count()`]) is derived from
/// what it has recorded so far.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Tracer<B>
where
    B: Backend,
{
    #[derivative(Debug = "ignore")]
    backend: B,
    config: TracerConfig,
    layout: TracerLayout,
    accumulated_samples: u32,
    pending_reset: bool,
}

impl<B> Tracer<B>
where
    B: Backend,
{
    pub fn new(
        mut backend: B,
        size: UVec2,
        config: TracerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let layout = TracerLayout::new(size, &config)?;

        info!(
            "Creating tracer: {}x{}, {}",
            size.x,
            size.y,
            config.describe()
        );

        backend.resize(&layout);
        backend.set_camera(config.camera.serialize(size));

        Ok(Self {
            backend,
            config,
            layout,
            accumulated_samples: 0,
            pending_reset: true,
        })
    }

    /// Reallocates queues, header, sort tables and output buffers for given
    /// resolution, zeroing the accumulation and the sample count.
    ///
    /// Calling this function twice with the same size leaves the tracer in
    /// the same state; on error the tracer stays as it was.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        let size = uvec2(width, height);
        let layout = TracerLayout::new(size, &self.config)?;

        info!("Resizing tracer: {width}x{height}");

        self.layout = layout;
        self.backend.resize(&layout);
        self.backend.set_camera(self.config.camera.serialize(size));
        self.reset_accumulation();

        Ok(())
    }

    /// Switches to a new configuration, restarting the accumulation if the
    /// change affects the image.
    pub fn update(&mut self, config: TracerConfig) -> Result<()> {
        config.validate()?;

        let layout = TracerLayout::new(self.layout.size, &config)?;
        let mut invalidated = self.config.is_invalidated_by(&config);

        if layout != self.layout {
            debug!("Layout changed: {:?} -> {:?}", self.layout, layout);

            self.layout = layout;
            self.backend.resize(&layout);

            invalidated = true;
        }

        self.backend.set_camera(config.camera.serialize(layout.size));
        self.config = config;

        if invalidated {
            debug!("Configuration changed, restarting accumulation");

            self.reset_accumulation();
        }

        Ok(())
    }

    /// Discards accumulated samples; the accumulation buffers are cleared at
    /// the beginning of the next sample.
    pub fn reset_accumulation(&mut self) {
        self.accumulated_samples = 0;
        self.pending_reset = true;
    }

    /// Returns the number of samples folded into the accumulation buffers so
    /// far; equal to the device header's counter once the recorded work
    /// completes.
    pub fn accumulated_sample_count(&self) -> u32 {
        self.accumulated_samples
    }

    /// Records a single sample with a random seed.
    pub fn compute_sample(&mut self, encoder: &mut B::Encoder) {
        self.compute_sample_with_seed(encoder, rand::thread_rng().gen());
    }

    pub fn compute_sample_with_seed(
        &mut self,
        encoder: &mut B::Encoder,
        seed: u32,
    ) {
        let schedule = Schedule::sample(
            &self.layout,
            &self.config,
            seed,
            mem::take(&mut self.pending_reset),
        );

        trace!(
            "Recording sample #{}: {} steps",
            self.accumulated_samples,
            schedule.len()
        );

        self.backend.run(encoder, &schedule);
        self.accumulated_samples += 1;
    }

    /// Records `samples_per_pixel` samples.
    pub fn render(&mut self, encoder: &mut B::Encoder) {
        measure("tick.render", || {
            for _ in 0..self.config.samples_per_pixel {
                self.compute_sample(encoder);
            }
        });
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn layout(&self) -> &TracerLayout {
        &self.layout
    }

    pub fn size(&self) -> UVec2 {
        self.layout.size
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl Tracer<WgpuBackend> {
    /// Uploads camera changes; must be called before submitting recorded
    /// samples.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.backend.flush(queue);
    }
}

impl<B> Drop for Tracer<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        info!(
            "Releasing tracer: {}x{}, {} samples accumulated",
            self.layout.size.x, self.layout.size.y, self.accumulated_samples
        );
    }
}
