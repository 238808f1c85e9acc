use std::f32::consts::PI;

use glam::{vec4, Mat4, UVec2};

use crate::gpu::{self, PassFlags, MAX_SORT_BUCKETS};
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct TracerConfig {
    pub camera: CameraParams,

    /// Maximum number of path segments, including the primary one; paths
    /// still alive after the last bounce are force-terminated.
    pub ray_depth: u32,

    /// Number of samples recorded by [`crate::Tracer::render()`].
    pub samples_per_pixel: u32,

    pub light_tracing: bool,
    pub russian_roulette: bool,

    /// Whether rays should be reordered by their coherency bucket before
    /// each bounce.
    pub ray_sort: bool,

    /// Whether albedo and normal of the first hit should be accumulated.
    pub aov_output: bool,

    pub mode: TracerMode,
    pub sort: SortConfig,
}

impl TracerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ray_depth == 0 {
            return Err(Error::InvalidConfig("ray_depth must be at least 1"));
        }

        if self.samples_per_pixel == 0 {
            return Err(Error::InvalidConfig(
                "samples_per_pixel must be at least 1",
            ));
        }

        if self.sort.buckets == 0 || self.sort.buckets > MAX_SORT_BUCKETS {
            return Err(Error::InvalidConfig(
                "sort.buckets must be within 1..=16",
            ));
        }

        Ok(())
    }

    /// Returns the number of path segments actually traced; debug modes look
    /// only at primary rays.
    pub fn effective_ray_depth(&self) -> u32 {
        match self.mode {
            TracerMode::Image => self.ray_depth,
            TracerMode::BvhTraversal => 1,
        }
    }

    /// Returns whether switching from `self` to `other` makes the samples
    /// accumulated so far incompatible with the new ones.
    ///
    /// Sorting and the number of samples per render don't affect what's
    /// being estimated, so toggling them keeps the accumulation going.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.camera != other.camera
            || self.ray_depth != other.ray_depth
            || self.light_tracing != other.light_tracing
            || self.russian_roulette != other.russian_roulette
            || self.aov_output != other.aov_output
            || self.mode != other.mode
    }

    pub(crate) fn flags(&self) -> u32 {
        let mut flags = 0;

        if self.light_tracing {
            flags |= PassFlags::LIGHT_TRACING;
        }

        if self.russian_roulette {
            flags |= PassFlags::RUSSIAN_ROULETTE;
        }

        if self.aov_output {
            flags |= PassFlags::AOV;
        }

        if let TracerMode::BvhTraversal = self.mode {
            flags |= PassFlags::BVH_TRAVERSAL;
        }

        flags
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "mode={:?}, ray_depth={}, spp={}, ray_sort={}",
            self.mode,
            self.effective_ray_depth(),
            self.samples_per_pixel,
            self.ray_sort,
        )
    }
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            camera: Default::default(),
            ray_depth: 4,
            samples_per_pixel: 1,
            light_tracing: false,
            russian_roulette: true,
            ray_sort: false,
            aov_output: false,
            mode: Default::default(),
            sort: Default::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracerMode {
    /// Regular path tracing.
    #[default]
    Image,

    /// Debug mode: primary rays only, kernels are expected to visualize the
    /// acceleration structure's traversal cost.
    BvhTraversal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortConfig {
    /// Number of distinct coherency buckets rays are grouped into.
    pub buckets: u32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self { buckets: 4 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub transform: Mat4,

    /// Vertical field of view, in radians.
    pub fov_y: f32,

    pub focal_length: f32,
    pub lens_radius: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraParams {
    pub(crate) fn serialize(&self, size: UVec2) -> gpu::Camera {
        let size = size.as_vec2();

        gpu::Camera {
            camera_to_world: self.transform,
            lens: vec4(self.focal_length, self.lens_radius, self.near, self.far),
            screen: vec4(
                size.x,
                size.y,
                (self.fov_y / 2.0).tan(),
                size.x / size.y,
            ),
        }
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            fov_y: PI / 4.0,
            focal_length: 1.0,
            lens_radius: 0.0,
            near: 0.0,
            far: 1000.0,
        }
    }
}
