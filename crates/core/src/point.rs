/// A single LIDAR return: position in the sensor frame plus intensity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointXYZI {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: f64,
}

impl PointXYZI {
    pub const fn new(x: f64, y: f64, z: f64, intensity: f64) -> Self {
        Self { x, y, z, intensity }
    }

    /// Euclidean distance from the sensor origin.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
