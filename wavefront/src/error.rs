use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Ray sorting is enabled, but the group-sums table of given capacity
    /// doesn't fit into a single scan workgroup, even with the largest tile.
    #[error(
        "cannot sort {capacity} rays: {buckets} buckets over tiles of \
         {tile_size} rays exceed the scan capacity of {ceiling} entries"
    )]
    Configuration {
        capacity: u32,
        tile_size: u32,
        buckets: u32,
        ceiling: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("invalid size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("readback failed: {0}")]
    Readback(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
