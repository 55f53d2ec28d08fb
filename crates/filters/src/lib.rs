#![forbid(unsafe_code)]

pub mod range;
pub mod voxel_grid;

pub use range::{range_filter, RangeFilter, MAX_MEASUREMENT_RANGE};
pub use voxel_grid::{voxel_grid_reduce, MIN_CELL_SIZE};
