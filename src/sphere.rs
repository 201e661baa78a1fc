use crate::distance::euclidean;

/// Bounding envelope of a node: every entry lies within `radius` of `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec<f64>,
    pub radius: f64,
}

impl Sphere {
    #[must_use]
    pub fn new(center: Vec<f64>, radius: f64) -> Sphere {
        Sphere { center, radius }
    }

    /// Lower bound on the distance from `point` to anything inside the sphere.
    #[must_use]
    pub fn min_distance(&self, point: &[f64]) -> f64 {
        (euclidean(&self.center, point) - self.radius).max(0.)
    }

    /// Upper bound on the distance from `point` to anything inside the sphere.
    #[must_use]
    pub fn max_distance(&self, point: &[f64]) -> f64 {
        euclidean(&self.center, point) + self.radius
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Sphere::new(Vec::new(), 0.0)
    }
}
