use glam::UVec2;

use crate::gpu::{SortLayout, MAX_PIXELS, MAX_SORT_TILE, SCAN_CAPACITY};
use crate::{Error, Result, TracerConfig};

/// Sizes of everything that gets reallocated on resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TracerLayout {
    pub size: UVec2,

    /// Number of pixels, which is also the capacity of each ray queue (every
    /// pixel has at most one path in flight).
    pub pixel_count: u32,

    /// Shape of the coherency sort; `None` if the queues are too large to be
    /// sorted (which is an error only if sorting is enabled).
    pub sort: Option<SortLayout>,
}

impl TracerLayout {
    pub fn new(size: UVec2, config: &TracerConfig) -> Result<Self> {
        let invalid_size = Error::InvalidSize {
            width: size.x,
            height: size.y,
        };

        if size.x == 0 || size.y == 0 {
            return Err(invalid_size);
        }

        let pixel_count = size
            .x
            .checked_mul(size.y)
            .filter(|&count| count <= MAX_PIXELS)
            .ok_or(invalid_size)?;

        let buckets = config.sort.buckets;
        let sort = SortLayout::fit(pixel_count, buckets);

        if config.ray_sort && sort.is_none() {
            return Err(Error::Configuration {
                capacity: pixel_count,
                tile_size: MAX_SORT_TILE,
                buckets,
                ceiling: SCAN_CAPACITY,
            });
        }

        Ok(Self {
            size,
            pixel_count,
            sort,
        })
    }

    pub fn queue_capacity(&self) -> u32 {
        self.pixel_count
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;
    use crate::SortConfig;

    fn sorting(buckets: u32) -> TracerConfig {
        TracerConfig {
            ray_sort: true,
            sort: SortConfig { buckets },
            ..Default::default()
        }
    }

    #[test]
    fn new() {
        let layout = TracerLayout::new(uvec2(64, 64), &sorting(4)).unwrap();

        assert_eq!(4096, layout.pixel_count);
        assert_eq!(4096, layout.queue_capacity());
        assert_eq!(256, layout.sort.unwrap().tile_size);
    }

    #[test]
    fn zero_size() {
        let config = TracerConfig::default();

        assert!(matches!(
            TracerLayout::new(uvec2(0, 64), &config),
            Err(Error::InvalidSize {
                width: 0,
                height: 64
            })
        ));

        assert!(matches!(
            TracerLayout::new(uvec2(u32::MAX, 2), &config),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn sort_beyond_scan_capacity() {
        // 16 buckets * ceil(1024 * 1024 / 4096) groups = 4096 entries
        let size = uvec2(1024, 1024);

        assert!(matches!(
            TracerLayout::new(size, &sorting(16)),
            Err(Error::Configuration {
                capacity: 1048576,
                buckets: 16,
                ceiling: 2048,
                ..
            })
        ));

        // ... which is fine as long as sorting is disabled
        let layout = TracerLayout::new(
            size,
            &TracerConfig {
                ray_sort: false,
                ..sorting(16)
            },
        )
        .unwrap();

        assert!(layout.sort.is_none());

        // ... or when there are fewer buckets
        assert!(TracerLayout::new(size, &sorting(8)).is_ok());
    }
}
