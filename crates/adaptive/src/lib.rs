#![forbid(unsafe_code)]
//! Adaptive voxel-grid downsampling.
//!
//! [`AdaptiveCellSizeController`] searches for a voxel cell size that keeps
//! each reduced frame inside a target point-count band, and
//! [`VoxelGridFilterNode`] runs the full per-frame pipeline around it.

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod node;

pub use config::FilterConfig;
pub use controller::{AdaptiveCellSizeController, ControllerState, FilterResult};
pub use error::{DownsamplerError, Result};
pub use metrics::{FrameHeader, FrameMetrics, FrameMetricsBuilder, FILTER_NAME};
pub use node::{ConfigHandle, FrameOutput, MetricsSink, SharedNode, VoxelGridFilterNode};
