use bytemuck::{Pod, Zeroable};
use glam::{uvec2, vec2, vec3, Mat4, UVec2, Vec4};

use crate::{Noise, Ray};

/// Camera parameters consumed by kernels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Camera {
    pub camera_to_world: Mat4,

    /// x - focal distance, y - lens radius, z - near plane, w - far plane
    pub lens: Vec4,

    /// x - width, y - height, z - tan(fov_y / 2), w - aspect ratio
    pub screen: Vec4,
}

impl Camera {
    pub fn screen_size(&self) -> UVec2 {
        uvec2(self.screen.x as u32, self.screen.y as u32)
    }

    pub fn pixel_count(&self) -> u32 {
        let size = self.screen_size();

        size.x * size.y
    }

    /// Given a pixel index, returns its screen-coordinates.
    pub fn pixel_to_screen(&self, pixel: u32) -> UVec2 {
        let width = self.screen.x as u32;

        uvec2(pixel % width, pixel / width)
    }

    /// Given screen-coordinates, returns a unique index for it; used to index
    /// screen-space structures.
    pub fn screen_to_pixel(&self, pos: UVec2) -> u32 {
        pos.y * (self.screen.x as u32) + pos.x
    }

    pub fn focal_distance(&self) -> f32 {
        self.lens.x
    }

    pub fn lens_radius(&self) -> f32 {
        self.lens.y
    }

    pub fn near(&self) -> f32 {
        self.lens.z
    }

    pub fn far(&self) -> f32 {
        self.lens.w
    }

    /// Casts a jittered thin-lens ray through given pixel.
    ///
    /// With zero lens radius this degenerates into a pinhole camera.
    pub fn ray(&self, pixel: u32, noise: &mut Noise) -> Ray {
        let screen_pos = self.pixel_to_screen(pixel).as_vec2()
            + vec2(noise.sample(), noise.sample());

        let ndc = screen_pos * 2.0 / self.screen.truncate().truncate()
            - glam::Vec2::ONE;

        let tan_half_fov = self.screen.z;
        let aspect = self.screen.w;

        let dir = vec3(
            ndc.x * tan_half_fov * aspect,
            -ndc.y * tan_half_fov,
            -1.0,
        );

        let focus_point = dir * self.focal_distance();
        let lens_point = (noise.sample_disk() * self.lens_radius()).extend(0.0);
        let dir = (focus_point - lens_point).normalize();

        let origin = self.camera_to_world.transform_point3(lens_point);
        let direction = self.camera_to_world.transform_vector3(dir).normalize();

        Ray::new(
            pixel,
            origin + direction * self.near(),
            direction,
            noise.state(),
        )
    }
}
