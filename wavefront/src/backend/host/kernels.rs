use glam::Vec3;

use crate::gpu::{self, Noise, PassFlags, Ray, RayPassParams};

/// Light-transport kernels executed by [`crate::HostBackend`].
///
/// Kernels are invoked concurrently, once per pixel (primary generation) or
/// once per active ray (bounces); the device takes care of queueing, so a
/// kernel only decides what happens with the path it's given.
pub trait HostKernels: Sync {
    /// Starts the path of given pixel.
    fn generate(&self, ctxt: &KernelContext, pixel: u32) -> Shading;

    /// Advances given path by one segment.
    fn bounce(&self, ctxt: &KernelContext, ray: &Ray) -> Shading;
}

#[derive(Clone, Copy, Debug)]
pub struct KernelContext<'a> {
    pub camera: &'a gpu::Camera,
    pub params: RayPassParams,
}

impl KernelContext<'_> {
    /// Returns noise for given pixel, decorrelated across samples and
    /// bounces.
    pub fn noise(&self, pixel: u32) -> Noise {
        Noise::new(
            self.params.seed ^ self.params.bounce.wrapping_mul(0x9e3779b9),
            pixel,
        )
    }

    pub fn has(&self, flag: u32) -> bool {
        self.params.has(flag)
    }

    pub fn russian_roulette(&self) -> bool {
        self.has(PassFlags::RUSSIAN_ROULETTE)
    }

    pub fn is_last_bounce(&self) -> bool {
        self.params.is_last_bounce()
    }
}

/// Outcome of a kernel invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shading {
    /// Radiance to add to the path's pixel.
    pub radiance: Vec3,

    /// Albedo and normal of the surface hit, if any; only the first one per
    /// sample is kept.
    pub aov: Option<(Vec3, Vec3)>,

    /// Continuation of the path; `None` retires it.
    pub next: Option<Ray>,
}

impl Shading {
    pub fn retire(radiance: Vec3) -> Self {
        Self {
            radiance,
            ..Default::default()
        }
    }

    pub fn extend(ray: Ray) -> Self {
        Self {
            next: Some(ray),
            ..Default::default()
        }
    }

    pub fn with_radiance(mut self, radiance: Vec3) -> Self {
        self.radiance += radiance;
        self
    }

    pub fn with_aov(mut self, albedo: Vec3, normal: Vec3) -> Self {
        self.aov = Some((albedo, normal));
        self
    }
}
