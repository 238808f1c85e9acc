#![allow(dead_code)]

use glam::{vec3, UVec2, Vec3};
use wavefront::gpu::Ray;
use wavefront::{HostBackend, HostKernels, KernelContext, Shading, Tracer};
use wavefront::{TracerConfig, TracerMode};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn tracer<K>(
    kernels: K,
    size: UVec2,
    config: TracerConfig,
) -> Tracer<HostBackend<K>>
where
    K: HostKernels,
{
    init();

    Tracer::new(HostBackend::new(kernels), size, config).unwrap()
}

pub fn config(ray_depth: u32) -> TracerConfig {
    TracerConfig {
        ray_depth,
        russian_roulette: false,
        mode: TracerMode::Image,
        ..Default::default()
    }
}

/// Every pixel starts a path; at bounce `n` a path gets retired (with unit
/// radiance) if bit `n - 1` of its pixel index is set, so each bounce halves
/// the number of active rays.
pub struct HalvingKernels;

impl HostKernels for HalvingKernels {
    fn generate(&self, _: &KernelContext, pixel: u32) -> Shading {
        Shading::extend(Ray::new(pixel, Vec3::ZERO, Vec3::Z, pixel))
    }

    fn bounce(&self, ctxt: &KernelContext, ray: &Ray) -> Shading {
        if (ray.pixel >> (ctxt.params.bounce - 1)) & 1 == 1 {
            Shading::retire(Vec3::ONE)
        } else {
            Shading::extend(*ray)
        }
    }
}

/// Random walk driven by the rays' own noise, which makes each pixel's
/// outcome independent of where its ray lands in the queues.
pub struct RandomWalkKernels {
    /// Probability of a path surviving a bounce.
    pub survival: f32,

    /// Number of coherency buckets to spread rays over.
    pub buckets: u32,

    /// Whether primary rays of odd pixels should miss the scene.
    pub miss_odd_pixels: bool,
}

impl Default for RandomWalkKernels {
    fn default() -> Self {
        Self {
            survival: 0.7,
            buckets: 4,
            miss_odd_pixels: false,
        }
    }
}

impl HostKernels for RandomWalkKernels {
    fn generate(&self, ctxt: &KernelContext, pixel: u32) -> Shading {
        if self.miss_odd_pixels && pixel % 2 == 1 {
            return Shading::retire(vec3(0.0, 0.0, 1.0));
        }

        let mut noise = ctxt.noise(pixel);
        let bucket = noise.sample_int() % self.buckets;

        let ray = Ray::new(pixel, Vec3::ZERO, Vec3::Z, noise.state())
            .with_bucket(bucket);

        Shading::extend(ray).with_aov(Vec3::ONE, Vec3::Y)
    }

    fn bounce(&self, _: &KernelContext, ray: &Ray) -> Shading {
        let mut noise = ray.noise();

        if noise.sample() >= self.survival {
            return Shading::retire(ray.throughput);
        }

        let bucket = noise.sample_int() % self.buckets;

        let origin = ray.origin + ray.direction;

        let ray = ray
            .scatter(origin, Vec3::X, Vec3::splat(0.5), noise)
            .with_bucket(bucket);

        Shading::extend(ray).with_radiance(Vec3::splat(0.1))
    }
}

/// Primary rays come from the camera; each bounce halves the throughput and
/// plays Russian roulette when the pass asks for it.
pub struct CameraKernels;

impl HostKernels for CameraKernels {
    fn generate(&self, ctxt: &KernelContext, pixel: u32) -> Shading {
        let ray = ctxt.camera.ray(pixel, &mut ctxt.noise(pixel));

        assert_eq!(pixel, ray.pixel);
        assert!(ray.direction.is_normalized());

        Shading::extend(ray)
    }

    fn bounce(&self, ctxt: &KernelContext, ray: &Ray) -> Shading {
        let mut ray = *ray;
        let mut noise = ray.noise();

        if ctxt.russian_roulette() && !ray.russian_roulette(&mut noise) {
            return Shading::retire(Vec3::ZERO);
        }

        let origin = ray.origin + ray.direction;
        let ray = ray.scatter(origin, ray.direction, Vec3::splat(0.5), noise);

        Shading::extend(ray).with_radiance(ray.throughput)
    }
}
