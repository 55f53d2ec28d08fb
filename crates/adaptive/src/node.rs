//! Per-frame orchestration: range filter, cell size search, metrics.
//!
//! Configuration replacements are queued on a channel and only picked up at
//! the start of a frame, so a frame never observes a half-applied config.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use downsampler_core::PointCloud;
use downsampler_filters::RangeFilter;

use crate::config::FilterConfig;
use crate::controller::AdaptiveCellSizeController;
use crate::error::Result;
use crate::metrics::{FrameHeader, FrameMetrics, FrameMetricsBuilder};

/// Destination for per-frame telemetry records.
pub trait MetricsSink: Send {
    fn record(&mut self, metrics: &FrameMetrics) -> Result<()>;
}

/// Reduced frame handed back to the caller.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub header: FrameHeader,
    pub cloud: PointCloud,
    pub metrics: FrameMetrics,
}

/// Sending side for configuration replacements. Cheap to clone and safe to
/// hand to another thread.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    tx: Sender<FilterConfig>,
}

impl ConfigHandle {
    /// Queues `config` for the next frame boundary. Returns `false` if the
    /// node has been dropped.
    pub fn update(&self, config: FilterConfig) -> bool {
        self.tx.send(config).is_ok()
    }
}

pub type SharedNode = Arc<Mutex<VoxelGridFilterNode>>;

pub struct VoxelGridFilterNode {
    config: FilterConfig,
    controller: AdaptiveCellSizeController,
    updates_tx: Sender<FilterConfig>,
    updates_rx: Receiver<FilterConfig>,
    sink: Option<Box<dyn MetricsSink>>,
    frames_processed: u64,
}

impl VoxelGridFilterNode {
    pub fn new(config: FilterConfig) -> Self {
        let (updates_tx, updates_rx) = unbounded();
        let controller = AdaptiveCellSizeController::from_config(&config);
        log_config_problems(&config);
        Self {
            config,
            controller,
            updates_tx,
            updates_rx,
            sink: None,
            frames_processed: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config_handle(&self) -> ConfigHandle {
        ConfigHandle {
            tx: self.updates_tx.clone(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn controller(&self) -> &AdaptiveCellSizeController {
        &self.controller
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn into_shared(self) -> SharedNode {
        Arc::new(Mutex::new(self))
    }

    /// Applies the newest queued configuration, discarding older ones.
    /// Returns whether anything was applied.
    pub fn apply_pending_config(&mut self) -> bool {
        let mut newest = None;
        while let Ok(config) = self.updates_rx.try_recv() {
            newest = Some(config);
        }
        match newest {
            Some(config) => {
                self.apply_config(config);
                true
            }
            None => false,
        }
    }

    /// Swaps in a new configuration snapshot.
    ///
    /// A static cell size also becomes the seed of any later dynamic search;
    /// in dynamic mode the converged size is kept.
    pub fn apply_config(&mut self, config: FilterConfig) {
        log_config_problems(&config);
        if !config.dynamic_mode {
            self.controller.reset(config.cell_size);
        }
        log::info!(
            "config applied: dynamic={} range={} cell_size={} step={} bounds=[{}, {}] band=[{}, {}]",
            config.dynamic_mode,
            config.measurement_range,
            config.cell_size,
            config.cell_size_step,
            config.min_cell_size,
            config.max_cell_size,
            config.min_points,
            config.max_points
        );
        self.config = config;
    }

    /// Runs one frame to completion.
    ///
    /// Data never fails a frame: empty or fully out-of-range clouds yield an
    /// empty result. Only a failing metrics sink returns an error.
    pub fn process_frame(
        &mut self,
        header: FrameHeader,
        cloud: &PointCloud,
    ) -> Result<FrameOutput> {
        self.apply_pending_config();

        let range_filter = RangeFilter::from_measurement_range(self.config.measurement_range);
        let in_range = range_filter.apply(cloud);
        // counted and timed from the range-limited cloud
        let started_at = Instant::now();
        let result = self.controller.process(&in_range, &self.config);
        let ended_at = Instant::now();

        let metrics = FrameMetricsBuilder::build(
            header.clone(),
            &in_range,
            &result,
            self.config.measurement_range,
            started_at,
            ended_at,
        );
        self.frames_processed += 1;

        log::debug!(
            "frame {} ({}): {} -> {} -> {} points, cell size {:.3}, {} reductions, {:.3} ms",
            header.seq,
            header.frame_id,
            cloud.len(),
            in_range.len(),
            metrics.filtered_count,
            metrics.cell_size_used,
            result.reductions,
            metrics.elapsed_ms
        );
        if self.config.dynamic_mode
            && !metrics.in_band(self.config.min_points, self.config.max_points)
        {
            log::warn!(
                "frame {}: {} points outside band [{}, {}] at cell size {:.3}",
                header.seq,
                metrics.filtered_count,
                self.config.min_points,
                self.config.max_points,
                metrics.cell_size_used
            );
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.record(&metrics)?;
        }

        Ok(FrameOutput {
            header,
            cloud: result.cloud,
            metrics,
        })
    }
}

fn log_config_problems(config: &FilterConfig) {
    for problem in config.validate() {
        log::warn!("{problem}; clamping");
    }
}
