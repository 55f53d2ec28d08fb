use std::time::Instant;

use downsampler_core::PointCloud;

use crate::controller::FilterResult;

pub const FILTER_NAME: &str = "voxel_grid_filter";

/// Identifier of the frame a cloud came from. Opaque to the filter: it is
/// copied onto the reduced cloud and its metrics unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameHeader {
    pub seq: u64,
    /// Acquisition time in seconds.
    pub stamp: f64,
    pub frame_id: String,
}

impl FrameHeader {
    pub fn new(seq: u64, stamp: f64, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// Telemetry for one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetrics {
    pub header: FrameHeader,
    pub filter_name: &'static str,
    pub original_count: usize,
    pub filtered_count: usize,
    pub cell_size_used: f64,
    pub measurement_range: f64,
    pub elapsed_ms: f64,
}

impl FrameMetrics {
    /// Whether the reduced cloud landed inside the target band. `false`
    /// marks a frame where the search gave up at a bound.
    pub fn in_band(&self, min_points: usize, max_points: usize) -> bool {
        (min_points..=max_points).contains(&self.filtered_count)
    }

    /// Fraction of input points that survived, `1.0` for an empty input.
    pub fn retention(&self) -> f64 {
        if self.original_count == 0 {
            return 1.0;
        }
        self.filtered_count as f64 / self.original_count as f64
    }
}

pub struct FrameMetricsBuilder;

impl FrameMetricsBuilder {
    pub fn build(
        header: FrameHeader,
        original: &PointCloud,
        result: &FilterResult,
        measurement_range: f64,
        started_at: Instant,
        ended_at: Instant,
    ) -> FrameMetrics {
        let elapsed = ended_at.saturating_duration_since(started_at);
        FrameMetrics {
            header,
            filter_name: FILTER_NAME,
            original_count: original.len(),
            filtered_count: result.cloud.len(),
            cell_size_used: result.cell_size_used,
            measurement_range,
            elapsed_ms: elapsed.as_micros() as f64 / 1000.0,
        }
    }
}
