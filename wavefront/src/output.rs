use std::path::Path;

use glam::{UVec2, Vec3, Vec4, Vec4Swizzles};
use image::{DynamicImage, Rgb, Rgb32FImage};

use crate::Result;

/// Accumulation buffers read back from the device.
///
/// Buffers are additive sums; `w` of each entry counts how many samples have
/// been folded into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub size: UVec2,

    /// Value of the header's accumulated-samples counter at the time of
    /// readback.
    pub samples: u32,

    pub radiance: Vec<Vec4>,
    pub albedo: Option<Vec<Vec4>>,
    pub normal: Option<Vec<Vec4>>,
}

impl Output {
    /// Returns the average radiance of given pixel.
    pub fn pixel(&self, pos: UVec2) -> Vec3 {
        average(self.radiance[(pos.y * self.size.x + pos.x) as usize])
    }

    pub fn radiance_image(&self) -> Rgb32FImage {
        to_image(self.size, &self.radiance)
    }

    pub fn albedo_image(&self) -> Option<Rgb32FImage> {
        self.albedo.as_ref().map(|albedo| to_image(self.size, albedo))
    }

    pub fn normal_image(&self) -> Option<Rgb32FImage> {
        self.normal.as_ref().map(|normal| to_image(self.size, normal))
    }

    /// Saves the averaged radiance as an 8-bit image, clamping values to
    /// `<0.0, 1.0>`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        DynamicImage::ImageRgb32F(self.radiance_image())
            .to_rgb8()
            .save(path)?;

        Ok(())
    }
}

fn average(sum: Vec4) -> Vec3 {
    if sum.w > 0.0 {
        sum.xyz() / sum.w
    } else {
        Vec3::ZERO
    }
}

fn to_image(size: UVec2, data: &[Vec4]) -> Rgb32FImage {
    Rgb32FImage::from_fn(size.x, size.y, |x, y| {
        let value = average(data[(y * size.x + x) as usize]);

        Rgb(value.to_array())
    })
}
