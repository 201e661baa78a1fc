use crate::error::{Result, SsTreeError};

/// A feature vector with an attached payload identifier (e.g. a file path).
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    coords: Vec<f64>,
    path: String,
}

impl Point {
    /// Creates a point with an empty payload identifier.
    #[must_use]
    pub fn new(coords: Vec<f64>) -> Point {
        Point {
            coords,
            path: String::new(),
        }
    }

    #[must_use]
    pub fn with_path(coords: Vec<f64>, path: impl Into<String>) -> Point {
        Point {
            coords,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }
}

impl From<Vec<f64>> for Point {
    fn from(coords: Vec<f64>) -> Self {
        Point::new(coords)
    }
}

// Rejects vectors that cannot take part in a tree of the given dimension.
pub(crate) fn check_coords(coords: &[f64], dimension: usize) -> Result<()> {
    if coords.len() != dimension {
        return Err(SsTreeError::DimensionMismatch {
            expected: dimension,
            actual: coords.len(),
        });
    }
    if let Some(axis) = coords.iter().position(|x| !x.is_finite()) {
        return Err(SsTreeError::NonFiniteCoordinate { axis });
    }
    Ok(())
}
