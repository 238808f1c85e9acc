use rayon::prelude::*;

use crate::gpu::{blelloch_scan, Ray, SortLayout, MAX_SORT_BUCKETS};

/// Host twin of `sort.wgsl`: a three-pass counting sort of rays by their
/// coherency bucket.
///
/// Ranks within a tile are handed out in slot order here, but the device
/// hands them out through workgroup atomics, so callers must not rely on the
/// order of rays within a bucket.
#[derive(Clone, Debug)]
pub struct HostSorter {
    layout: SortLayout,
    ranks: Vec<u32>,
    table: Vec<u32>,
}

impl HostSorter {
    pub fn new(layout: SortLayout) -> Self {
        Self {
            layout,
            ranks: vec![0; layout.capacity as usize],
            table: vec![0; layout.scan_len() as usize],
        }
    }

    pub fn layout(&self) -> &SortLayout {
        &self.layout
    }

    /// Bucket-major group sums; per-bucket totals after [`Self::scan_groups()`]
    /// and global offsets after [`Self::scan_sums()`].
    pub fn table(&self) -> &[u32] {
        &self.table[..self.layout.table_len() as usize]
    }

    /// Pass 1: computes each active ray's rank within its tile and bucket,
    /// and each tile's per-bucket totals.
    pub fn scan_groups(&mut self, rays: &[Ray], active: u32) {
        let layout = self.layout;
        let tile_size = layout.tile_size as usize;

        let totals: Vec<[u32; MAX_SORT_BUCKETS as usize]> = self
            .ranks
            .par_chunks_mut(tile_size)
            .zip(rays.par_chunks(tile_size))
            .enumerate()
            .map(|(group, (ranks, rays))| {
                let mut totals = [0; MAX_SORT_BUCKETS as usize];

                for (idx, (rank, ray)) in ranks.iter_mut().zip(rays).enumerate()
                {
                    if (group * tile_size + idx) as u32 >= active {
                        break;
                    }

                    let key = layout.key_of(ray) as usize;

                    *rank = totals[key];
                    totals[key] += 1;
                }

                totals
            })
            .collect();

        self.table.fill(0);

        for (group, totals) in totals.iter().enumerate() {
            for bucket in 0..layout.bucket_count {
                self.table[layout.table_idx(bucket, group as u32)] =
                    totals[bucket as usize];
            }
        }
    }

    /// Pass 2: turns the group sums into global offsets; returns the total
    /// (i.e. the number of rays sorted).
    pub fn scan_sums(&mut self) -> u32 {
        blelloch_scan(&mut self.table)
    }

    /// Pass 3: moves each active ray into its final slot in `out`.
    pub fn scatter(&self, rays: &[Ray], active: u32, out: &mut [Ray]) {
        let layout = self.layout;

        let slots: Vec<usize> = rays[..active as usize]
            .par_iter()
            .zip(&self.ranks[..active as usize])
            .enumerate()
            .map(|(slot, (ray, rank))| {
                let group = layout.group_of(slot as u32);
                let bucket = layout.key_of(ray);

                (self.table[layout.table_idx(bucket, group)] + rank) as usize
            })
            .collect();

        for (ray, slot) in rays.iter().zip(slots) {
            out[slot] = *ray;
        }
    }

    /// Runs all three passes, using `scratch` as the scatter target, and
    /// moves the result back into `rays`.
    pub fn sort(&mut self, rays: &mut [Ray], scratch: &mut [Ray], active: u32) {
        self.scan_groups(rays, active);

        let total = self.scan_sums();

        assert_eq!(active, total, "sort lost some rays");

        self.scatter(rays, active, scratch);

        rays[..active as usize].copy_from_slice(&scratch[..active as usize]);
    }

    /// Returns how many of the active rays fall into each bucket.
    pub fn bucket_counts(&self, rays: &[Ray], active: u32) -> Vec<u32> {
        let mut counts = vec![0; self.layout.bucket_count as usize];

        for ray in &rays[..active as usize] {
            counts[self.layout.key_of(ray) as usize] += 1;
        }

        counts
    }

    /// Returns whether active rays of each bucket form a single contiguous
    /// run.
    pub fn is_partitioned(&self, rays: &[Ray], active: u32) -> bool {
        let mut seen = [false; MAX_SORT_BUCKETS as usize];
        let mut prev = None;

        for ray in &rays[..active as usize] {
            let key = self.layout.key_of(ray);

            if prev != Some(key) {
                if seen[key as usize] {
                    return false;
                }

                seen[key as usize] = true;
                prev = Some(key);
            }
        }

        true
    }
}
