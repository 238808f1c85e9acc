use std::mem;

use glam::Vec4;
use log::debug;

use crate::gpu::{DispatchHeader, PixelSample, Ray};
use crate::{DoubleBuffered, StorageBuffer, TracerLayout};

/// Everything [`crate::WgpuBackend`] allocates per resolution.
#[derive(Debug)]
pub struct DeviceBuffers {
    pub header: StorageBuffer,

    /// Copy of the header's dispatch arguments, consumed by indirect
    /// dispatches (the header itself is bound as writable storage then).
    pub dispatch: StorageBuffer,

    pub queues: DoubleBuffered<StorageBuffer>,
    pub samples: StorageBuffer,
    pub radiance: StorageBuffer,
    pub albedo: StorageBuffer,
    pub normal: StorageBuffer,
    pub sort_ranks: StorageBuffer,
    pub sort_table: StorageBuffer,
}

impl DeviceBuffers {
    pub fn new(device: &wgpu::Device, layout: &TracerLayout) -> Self {
        debug!(
            "Initializing buffers: {}x{}",
            layout.size.x, layout.size.y
        );

        let pixels = layout.pixel_count as usize;
        let queue_capacity = layout.queue_capacity() as usize;

        let (sort_ranks, sort_table) = layout
            .sort
            .map(|sort| (sort.capacity as usize, sort.scan_len() as usize))
            .unwrap_or_default();

        Self {
            header: StorageBuffer::new(
                device,
                "wavefront_header",
                mem::size_of::<DispatchHeader>(),
            ),
            dispatch: StorageBuffer::new_indirect(
                device,
                "wavefront_dispatch",
                3 * mem::size_of::<u32>(),
            ),
            queues: DoubleBuffered::new(
                device,
                "wavefront_queue",
                queue_capacity * mem::size_of::<Ray>(),
            ),
            samples: StorageBuffer::new(
                device,
                "wavefront_samples",
                pixels * mem::size_of::<PixelSample>(),
            ),
            radiance: StorageBuffer::new(
                device,
                "wavefront_radiance",
                pixels * mem::size_of::<Vec4>(),
            ),
            albedo: StorageBuffer::new(
                device,
                "wavefront_albedo",
                pixels * mem::size_of::<Vec4>(),
            ),
            normal: StorageBuffer::new(
                device,
                "wavefront_normal",
                pixels * mem::size_of::<Vec4>(),
            ),
            sort_ranks: StorageBuffer::new(
                device,
                "wavefront_sort_ranks",
                sort_ranks * mem::size_of::<u32>(),
            ),
            sort_table: StorageBuffer::new(
                device,
                "wavefront_sort_table",
                sort_table * mem::size_of::<u32>(),
            ),
        }
    }
}
