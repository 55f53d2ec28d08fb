use crate::{Aabb, PointXYZI};

/// Ordered XYZI point cloud in structure-of-arrays layout.
///
/// Order carries no meaning for the filters but every operation preserves
/// it, so results are reproducible frame to frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
        }
    }

    pub fn from_xyzi(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>, intensity: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");
        assert_eq!(
            x.len(),
            intensity.len(),
            "x and intensity must have same length"
        );

        Self { x, y, z, intensity }
    }

    /// Builds a cloud with zero intensity on every point.
    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        let intensity = vec![0.0; x.len()];
        Self::from_xyzi(x, y, z, intensity)
    }

    pub fn from_points(points: &[PointXYZI]) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push(*p);
        }
        cloud
    }

    pub fn push(&mut self, p: PointXYZI) {
        self.x.push(p.x);
        self.y.push(p.y);
        self.z.push(p.z);
        self.intensity.push(p.intensity);
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        debug_assert_eq!(self.x.len(), self.intensity.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_xyz(&self.x, &self.y, &self.z)
    }

    pub fn point(&self, i: usize) -> PointXYZI {
        PointXYZI::new(self.x[i], self.y[i], self.z[i], self.intensity[i])
    }

    pub fn iter_points(&self) -> impl Iterator<Item = PointXYZI> + '_ {
        (0..self.len()).map(move |i| self.point(i))
    }

    /// Copies the points at `indices`, in the order given.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = Self::with_capacity(indices.len());
        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            out.push(self.point(idx));
        }
        out
    }
}
