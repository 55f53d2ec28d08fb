//! voxel_grid_filter - adaptive voxel-grid downsampling over PCD frames
//!
//! Reads every `*.pcd` file in an input directory as one frame, reduces it
//! with the adaptive voxel-grid filter and writes the result to an output
//! directory under the same file name.
//!
//! # Usage
//!
//! ```bash
//! # Static cell size from defaults
//! voxel_grid_filter --input scans/ --output reduced/
//!
//! # Dynamic search, CSV metrics log, live config reload between frames
//! voxel_grid_filter -i scans/ -o reduced/ -c voxel_grid_filter.toml --output-log --watch-config
//! ```

mod source;

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use downsampler_adaptive::{DownsamplerError, Result, VoxelGridFilterNode};
use downsampler_io::{default_log_file_name, read_pcd, write_pcd_binary, CsvMetricsLog};

use crate::source::{list_frames, load_config, ConfigWatcher};

#[derive(Parser, Debug)]
#[command(name = "voxel_grid_filter", version, about = "Adaptive voxel-grid point cloud downsampler")]
struct Args {
    /// Directory of input PCD frames, processed in file name order
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for reduced frames (not written when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML filter configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append per-frame metrics to a CSV log
    #[arg(long)]
    output_log: bool,

    /// CSV log path (default: voxel_grid_filter_<YYYYMMDD_HHMMSS>.csv)
    #[arg(long, requires = "output_log")]
    log_file: Option<PathBuf>,

    /// Re-read the config file between frames when it changes
    #[arg(long, requires = "config")]
    watch_config: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    // The log sink must be open before the first frame is accepted.
    let sink = if args.output_log {
        let path = args
            .log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_log_file_name()));
        Some(CsvMetricsLog::open(path)?)
    } else {
        None
    };

    let frames = list_frames(&args.input).map_err(|e| {
        DownsamplerError::Config(format!(
            "cannot list input directory {}: {}",
            args.input.display(),
            e
        ))
    })?;
    if let Some(output) = &args.output {
        fs::create_dir_all(output)?;
    }

    let mut node = VoxelGridFilterNode::new(config);
    if let Some(sink) = sink {
        node = node.with_sink(Box::new(sink));
    }
    let config_handle = node.config_handle();
    let mut watcher = match (&args.config, args.watch_config) {
        (Some(path), true) => Some(ConfigWatcher::new(path)),
        _ => None,
    };

    log::info!(
        "voxel_grid_filter starting: {} frames from {}",
        frames.len(),
        args.input.display()
    );

    let mut elapsed_total = 0.0;
    let mut out_of_band = 0usize;
    for frame in &frames {
        if let Some(update) = watcher.as_mut().and_then(ConfigWatcher::poll) {
            config_handle.update(update);
        }

        let cloud = match read_pcd(&frame.path) {
            Ok(cloud) => cloud,
            Err(e) => {
                log::error!("skipping {}: {}", frame.path.display(), e);
                continue;
            }
        };

        let output = node.process_frame(frame.header.clone(), &cloud)?;
        let config = node.config();
        if config.dynamic_mode && !output.metrics.in_band(config.min_points, config.max_points) {
            out_of_band += 1;
        }
        elapsed_total += output.metrics.elapsed_ms;

        log::info!(
            "{}: cell size {:.3}, {} -> {} points ({:.1}% kept)",
            output.header.frame_id,
            output.metrics.cell_size_used,
            output.metrics.original_count,
            output.metrics.filtered_count,
            output.metrics.retention() * 100.0
        );

        if let (Some(dir), Some(name)) = (&args.output, frame.path.file_name()) {
            write_pcd_binary(dir.join(name), &output.cloud)?;
        }
    }

    let processed = node.frames_processed();
    if processed > 0 {
        log::info!(
            "processed {} frames, mean {:.3} ms per frame, {} outside the target band",
            processed,
            elapsed_total / processed as f64,
            out_of_band
        );
    } else {
        log::warn!("no frames processed");
    }

    Ok(())
}
