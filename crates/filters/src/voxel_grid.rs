use downsampler_core::PointCloud;
use hashbrown::HashMap;

/// Smallest cell edge the reducer can resolve. Callers clamp requested cell
/// sizes up to this before calling [`voxel_grid_reduce`].
pub const MIN_CELL_SIZE: f64 = 0.1;

#[derive(Default, Clone, Copy)]
struct VoxelAccum {
    sx: f64,
    sy: f64,
    sz: f64,
    si: f64,
    n: usize,
}

/// Collapses every occupied cubic cell of edge `cell_size` into the
/// attribute-wise mean of its points.
///
/// The grid is anchored at the minimum corner of the cloud's bounding box.
/// Output points are ordered by ascending cell index, so the result is
/// deterministic for a given input. Points with a non-finite coordinate are
/// skipped.
pub fn voxel_grid_reduce(cloud: &PointCloud, cell_size: f64) -> PointCloud {
    debug_assert!(
        cell_size.is_finite() && cell_size >= MIN_CELL_SIZE,
        "cell_size must be finite and >= {MIN_CELL_SIZE}, got {cell_size}"
    );

    if cloud.is_empty() {
        return PointCloud::new();
    }

    let aabb = cloud.aabb();
    if aabb.is_empty() {
        return PointCloud::new();
    }
    let origin = aabb.min;
    let inv = 1.0 / cell_size;

    let mut bins: HashMap<(i64, i64, i64), VoxelAccum> = HashMap::new();

    for p in cloud.iter_points() {
        if !p.is_finite() {
            continue;
        }

        let key = (
            ((p.x - origin[0]) * inv).floor() as i64,
            ((p.y - origin[1]) * inv).floor() as i64,
            ((p.z - origin[2]) * inv).floor() as i64,
        );

        let entry = bins.entry(key).or_default();
        entry.sx += p.x;
        entry.sy += p.y;
        entry.sz += p.z;
        entry.si += p.intensity;
        entry.n += 1;
    }

    let mut cells: Vec<((i64, i64, i64), VoxelAccum)> = bins.into_iter().collect();
    cells.sort_unstable_by_key(|(key, _)| *key);

    let mut out = PointCloud::with_capacity(cells.len());
    for (_, a) in cells {
        let denom = a.n as f64;
        out.x.push(a.sx / denom);
        out.y.push(a.sy / denom);
        out.z.push(a.sz / denom);
        out.intensity.push(a.si / denom);
    }

    out
}
