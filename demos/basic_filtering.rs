use downsampler_core::PointCloud;
use downsampler_filters::{voxel_grid_reduce, RangeFilter};

fn main() {
    // Synthetic scan: 20000 points spread over a 60 m square
    let n = 20_000;
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.731) % 60.0 - 30.0).collect();
    let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.419) % 60.0 - 30.0).collect();
    let z: Vec<f64> = (0..n).map(|i| (i as f64 * 0.257) % 4.0).collect();
    let cloud = PointCloud::from_xyz(x, y, z);
    println!("Original cloud: {} points", cloud.len());

    // Keep points within 25 m of the sensor
    let in_range = RangeFilter::from_measurement_range(25.0).apply(&cloud);
    println!("After range filter (<= 25 m): {} points", in_range.len());

    for cell_size in [0.5, 1.0, 2.0] {
        let reduced = voxel_grid_reduce(&in_range, cell_size);
        println!("Voxel grid (cell={cell_size}): {} points", reduced.len());
    }

    let aabb = in_range.aabb();
    println!("Bounding box: min={:?}, max={:?}", aabb.min, aabb.max);
}
