use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Contribution of a single path to its pixel within the current sample.
///
/// Since every pixel has at most one path in flight, kernels can write to
/// their pixel's sample without atomics.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PixelSample {
    /// Radiance gathered along the path so far (`w` is unused).
    pub radiance: Vec4,

    /// Albedo of the first surface hit (`w` = 1.0 once written).
    pub albedo: Vec4,

    /// Normal of the first surface hit (`w` = 1.0 once written).
    pub normal: Vec4,
}

impl PixelSample {
    pub fn add_radiance(&mut self, radiance: Vec3) {
        self.radiance += radiance.extend(0.0);
    }

    /// Records auxiliary outputs; only the first call per sample sticks.
    pub fn write_aov(&mut self, albedo: Vec3, normal: Vec3) {
        if self.albedo.w == 0.0 {
            self.albedo = albedo.extend(1.0);
            self.normal = normal.extend(1.0);
        }
    }

    /// Folds this sample into the persistent buffers.
    ///
    /// `w` of the radiance sum counts how many samples have been folded into
    /// it, so that readers can average without knowing the sample count.
    pub fn accumulate(
        &self,
        radiance: &mut Vec4,
        aov: Option<(&mut Vec4, &mut Vec4)>,
    ) {
        *radiance += self.radiance.truncate().extend(1.0);

        if let Some((albedo, normal)) = aov {
            *albedo += self.albedo.truncate().extend(1.0);
            *normal += self.normal.truncate().extend(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn first_aov_wins() {
        let mut target = PixelSample::default();

        target.write_aov(vec3(1.0, 0.0, 0.0), Vec3::Y);
        target.write_aov(vec3(0.0, 1.0, 0.0), Vec3::X);

        assert_eq!(vec3(1.0, 0.0, 0.0), target.albedo.truncate());
        assert_eq!(Vec3::Y, target.normal.truncate());
    }

    #[test]
    fn accumulate() {
        let mut radiance = Vec4::ZERO;
        let mut albedo = Vec4::ZERO;
        let mut normal = Vec4::ZERO;

        let mut target = PixelSample::default();

        target.add_radiance(vec3(0.5, 1.0, 2.0));
        target.add_radiance(vec3(0.5, 0.0, 0.0));
        target.write_aov(Vec3::ONE, Vec3::Z);

        target.accumulate(&mut radiance, Some((&mut albedo, &mut normal)));
        target.accumulate(&mut radiance, None);

        assert_relative_eq!(2.0, radiance.x);
        assert_relative_eq!(4.0, radiance.z);
        assert_relative_eq!(2.0, radiance.w);
        assert_relative_eq!(1.0, albedo.w);
        assert_relative_eq!(1.0, normal.z);
    }
}
