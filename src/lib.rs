#![forbid(unsafe_code)]
//! Adaptive voxel-grid downsampling for LIDAR point clouds.
//!
//! Umbrella package re-exporting the workspace crates for the integration
//! tests, benches and demos that live at the repository root.

pub use downsampler_adaptive::{
    AdaptiveCellSizeController, ConfigHandle, ControllerState, DownsamplerError, FilterConfig,
    FilterResult, FrameHeader, FrameMetrics, FrameMetricsBuilder, FrameOutput, MetricsSink,
    VoxelGridFilterNode,
};
pub use downsampler_core::{Aabb, PointCloud, PointXYZI};
pub use downsampler_filters::{range_filter, voxel_grid_reduce, RangeFilter};
