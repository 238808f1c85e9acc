use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::Noise;

/// State of a single in-flight path, as stored in the ray queues.
///
/// A ray lives in exactly one queue at a time; each bounce moves it from the
/// source queue into the target queue (or drops it).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Ray {
    pub origin: Vec3,

    /// Index of the pixel this path contributes to.
    pub pixel: u32,

    pub direction: Vec3,

    /// Per-ray noise state; see [`Noise::from_state()`].
    pub rng: u32,

    /// Accumulated path weight.
    pub throughput: Vec3,

    /// [`Self::TERMINATED`] + coherency bucket (lower 16 bits).
    pub flags: u32,
}

impl Ray {
    /// Set on rays which got retired during primary generation (e.g. missed
    /// the scene); they keep their slot, but bounce kernels skip them.
    pub const TERMINATED: u32 = 1 << 31;

    const BUCKET_MASK: u32 = 0xffff;

    pub fn new(pixel: u32, origin: Vec3, direction: Vec3, rng: u32) -> Self {
        Self {
            origin,
            pixel,
            direction,
            rng,
            throughput: Vec3::ONE,
            flags: 0,
        }
    }

    /// Creates a placeholder for a path that's already finished.
    pub fn terminated(pixel: u32) -> Self {
        Self {
            pixel,
            flags: Self::TERMINATED,
            ..Default::default()
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.flags & Self::TERMINATED != 0
    }

    /// Returns the coherency bucket hint left by the kernel which emitted this
    /// ray (e.g. material of the surface it's about to hit).
    pub fn bucket(&self) -> u32 {
        self.flags & Self::BUCKET_MASK
    }

    pub fn with_bucket(mut self, bucket: u32) -> Self {
        self.flags =
            (self.flags & !Self::BUCKET_MASK) | (bucket & Self::BUCKET_MASK);

        self
    }

    pub fn noise(&self) -> Noise {
        Noise::from_state(self.rng)
    }

    /// Continues this path from given point, attenuating it by `weight`.
    pub fn scatter(
        mut self,
        origin: Vec3,
        direction: Vec3,
        weight: Vec3,
        noise: Noise,
    ) -> Self {
        self.origin = origin;
        self.direction = direction;
        self.throughput *= weight;
        self.rng = noise.state();
        self
    }

    /// Stochastically kills low-contribution paths; survivors are reweighted
    /// so that the estimator stays unbiased.
    ///
    /// Returns whether the path survived.
    pub fn russian_roulette(&mut self, noise: &mut Noise) -> bool {
        let survival = self.throughput.max_element().clamp(0.05, 1.0);

        if noise.sample() > survival {
            return false;
        }

        self.throughput /= survival;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::mem;

    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn layout() {
        assert_eq!(48, mem::size_of::<Ray>());
    }

    #[test]
    fn flags() {
        let ray = Ray::new(12, Vec3::ZERO, Vec3::X, 0).with_bucket(7);

        assert_eq!(7, ray.bucket());
        assert!(!ray.is_terminated());

        let ray = Ray::terminated(12).with_bucket(3);

        assert_eq!(3, ray.bucket());
        assert_eq!(12, ray.pixel);
        assert!(ray.is_terminated());
    }

    #[test]
    fn russian_roulette_keeps_bright_paths() {
        let mut ray = Ray::new(0, Vec3::ZERO, Vec3::X, 0);
        let mut noise = Noise::new(1, 1);

        for _ in 0..100 {
            assert!(ray.russian_roulette(&mut noise));
        }

        assert_relative_eq!(1.0, ray.throughput.x);
    }

    #[test]
    fn russian_roulette_reweights_survivors() {
        let mut noise = Noise::new(1234, 0);
        let mut survivors = 0;
        let mut total_weight = 0.0;

        for _ in 0..10_000 {
            let mut ray = Ray {
                throughput: vec3(0.25, 0.1, 0.1),
                ..Ray::new(0, Vec3::ZERO, Vec3::X, 0)
            };

            if ray.russian_roulette(&mut noise) {
                survivors += 1;
                total_weight += ray.throughput.x;

                assert_relative_eq!(1.0, ray.throughput.x);
            }
        }

        // Expected value of the weight must be preserved
        assert_relative_eq!(0.25, total_weight / 10_000.0, epsilon = 0.02);
        assert!(survivors > 2000 && survivors < 3000);
    }
}
