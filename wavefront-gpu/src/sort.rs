use bytemuck::{Pod, Zeroable};

use crate::Ray;

/// Maximum number of entries the single-workgroup hierarchical scan can
/// process; `sort.wgsl` keeps this many `u32`s in workgroup memory.
pub const SCAN_CAPACITY: u32 = 2048;

/// Invocations of the hierarchical-scan workgroup; each one handles
/// `SCAN_CAPACITY / SORT_WORKGROUP_SIZE` entries.
pub const SORT_WORKGROUP_SIZE: u32 = 256;

pub const MAX_SORT_BUCKETS: u32 = 16;
pub const MIN_SORT_TILE: u32 = 256;
pub const MAX_SORT_TILE: u32 = 4096;

/// Shape of the coherency sort for given queue capacity.
///
/// Rays are split into tiles of `tile_size` consecutive slots; each tile is
/// processed by one workgroup of the group-scan and scatter passes, whose
/// per-bucket totals land in a bucket-major table of
/// `bucket_count * group_count` entries. That table must fit into a single
/// scan workgroup, which is what bounds the capacity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SortLayout {
    pub capacity: u32,
    pub tile_size: u32,
    pub group_count: u32,
    pub bucket_count: u32,
}

impl SortLayout {
    /// Picks the smallest tile that makes the group-sums table fit into the
    /// scan; returns `None` if even the largest tile doesn't.
    pub fn fit(capacity: u32, bucket_count: u32) -> Option<Self> {
        if bucket_count == 0 || bucket_count > MAX_SORT_BUCKETS {
            return None;
        }

        let mut tile_size = MIN_SORT_TILE;

        while tile_size <= MAX_SORT_TILE {
            let group_count = capacity.div_ceil(tile_size).max(1);

            if bucket_count * group_count <= SCAN_CAPACITY {
                return Some(Self {
                    capacity,
                    tile_size,
                    group_count,
                    bucket_count,
                });
            }

            tile_size *= 2;
        }

        None
    }

    /// Returns the largest capacity sortable with given number of buckets.
    pub fn max_capacity(bucket_count: u32) -> u32 {
        (SCAN_CAPACITY / bucket_count.max(1)) * MAX_SORT_TILE
    }

    /// Number of entries in the group-sums table.
    pub fn table_len(&self) -> u32 {
        self.bucket_count * self.group_count
    }

    /// Length of the table rounded up for the Blelloch scan.
    pub fn scan_len(&self) -> u32 {
        self.table_len().next_power_of_two()
    }

    pub fn key_of(&self, ray: &Ray) -> u32 {
        ray.bucket() % self.bucket_count
    }

    pub fn group_of(&self, slot: u32) -> u32 {
        slot / self.tile_size
    }

    /// Returns where given bucket's total for given group lives; bucket-major,
    /// so that after an exclusive scan each entry is the global offset of the
    /// group's run within its bucket.
    pub fn table_idx(&self, bucket: u32, group: u32) -> usize {
        (bucket * self.group_count + group) as usize
    }
}
