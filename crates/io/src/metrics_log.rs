//! Append-only CSV log of per-frame metrics.
//!
//! One headerless record per frame:
//! `seq,stamp,frame_id,filter_name,original_count,filtered_count,cell_size_used,measurement_range,elapsed_ms`

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use downsampler_adaptive::{DownsamplerError, FrameMetrics, MetricsSink, Result};
use serde::Serialize;

#[derive(Serialize)]
struct MetricsRecord<'a> {
    seq: u64,
    stamp: f64,
    frame_id: &'a str,
    filter_name: &'a str,
    original_count: usize,
    filtered_count: usize,
    cell_size_used: f64,
    measurement_range: f64,
    elapsed_ms: f64,
}

impl<'a> From<&'a FrameMetrics> for MetricsRecord<'a> {
    fn from(m: &'a FrameMetrics) -> Self {
        Self {
            seq: m.header.seq,
            stamp: m.header.stamp,
            frame_id: &m.header.frame_id,
            filter_name: m.filter_name,
            original_count: m.original_count,
            filtered_count: m.filtered_count,
            cell_size_used: m.cell_size_used,
            measurement_range: m.measurement_range,
            elapsed_ms: m.elapsed_ms,
        }
    }
}

/// Log file name stamped with the local start time, e.g.
/// `voxel_grid_filter_20240131_235959.csv`.
pub fn default_log_file_name() -> String {
    format!(
        "voxel_grid_filter_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

pub struct CsvMetricsLog {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvMetricsLog {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// Fails with [`DownsamplerError::SinkUnavailable`]; callers treat that
    /// as fatal at startup rather than discovering it on the first frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| DownsamplerError::SinkUnavailable {
                path: path.clone(),
                source,
            })?;
        log::info!("writing frame metrics to {}", path.display());

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for CsvMetricsLog {
    fn record(&mut self, metrics: &FrameMetrics) -> Result<()> {
        self.writer
            .serialize(MetricsRecord::from(metrics))
            .map_err(|e| DownsamplerError::Sink(e.to_string()))?;
        self.writer.flush()?;
        Ok(())
    }
}
