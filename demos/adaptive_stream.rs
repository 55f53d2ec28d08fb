use downsampler_adaptive::{FilterConfig, FrameHeader, VoxelGridFilterNode};
use downsampler_core::{PointCloud, PointXYZI};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A scan whose density grows frame by frame, as when approaching a wall.
fn scan(frame: u64, rng: &mut StdRng) -> PointCloud {
    let n = 8_000 + frame as usize * 4_000;
    let mut cloud = PointCloud::with_capacity(n);
    for _ in 0..n {
        cloud.push(PointXYZI::new(
            rng.gen_range(-30.0..30.0),
            rng.gen_range(-30.0..30.0),
            rng.gen_range(-1.0..3.0),
            rng.gen_range(0.0..100.0),
        ));
    }
    cloud
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut node = VoxelGridFilterNode::new(FilterConfig {
        dynamic_mode: true,
        ..FilterConfig::default()
    });
    let handle = node.config_handle();
    let mut rng = StdRng::seed_from_u64(3);

    for seq in 0..8u64 {
        if seq == 5 {
            // Ask for a sparser output from the next frame on
            handle.update(FilterConfig {
                dynamic_mode: true,
                min_points: 500,
                max_points: 1_000,
                ..FilterConfig::default()
            });
        }

        let cloud = scan(seq, &mut rng);
        let header = FrameHeader::new(seq, seq as f64 * 0.1, "lidar");
        let output = match node.process_frame(header, &cloud) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("frame {seq}: {e}");
                return;
            }
        };
        println!(
            "frame {}: {} -> {} points at cell size {:.2} ({:.2} ms)",
            seq,
            output.metrics.original_count,
            output.metrics.filtered_count,
            output.metrics.cell_size_used,
            output.metrics.elapsed_ms
        );
    }
}
