use downsampler_core::PointCloud;

/// Measurement range that means "no limit": a range filter configured with
/// this upper bound passes the cloud through untouched.
pub const MAX_MEASUREMENT_RANGE: f64 = 200.0;

/// Keeps points whose distance from the sensor origin lies in
/// `[min_range, max_range]`, preserving their relative order.
///
/// Points with a non-finite coordinate are dropped.
pub fn range_filter(cloud: &PointCloud, min_range: f64, max_range: f64) -> PointCloud {
    if cloud.is_empty() {
        return PointCloud::new();
    }

    let keep: Vec<usize> = (0..cloud.len())
        .filter(|&i| {
            let d = cloud.point(i).norm();
            d.is_finite() && d >= min_range && d <= max_range
        })
        .collect();

    cloud.select(&keep)
}

/// Radial band pre-filter applied before voxel reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    pub min_range: f64,
    pub max_range: f64,
}

impl RangeFilter {
    pub fn new(min_range: f64, max_range: f64) -> Self {
        Self {
            min_range,
            max_range,
        }
    }

    /// Band `[0, measurement_range]` around the sensor.
    pub fn from_measurement_range(measurement_range: f64) -> Self {
        Self::new(0.0, measurement_range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_range == MAX_MEASUREMENT_RANGE
    }

    pub fn apply(&self, cloud: &PointCloud) -> PointCloud {
        if self.is_unbounded() {
            return cloud.clone();
        }
        range_filter(cloud, self.min_range, self.max_range)
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::from_measurement_range(MAX_MEASUREMENT_RANGE)
    }
}
