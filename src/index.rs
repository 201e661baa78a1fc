use crate::{error::Result, point::Point, sstree::SsTree};

/// Common surface of the point indexes, so the tree can be checked against the
/// brute-force [`LinearIndex`](crate::LinearIndex).
pub trait Index {
    fn insert(&mut self, point: Point) -> Result<()>;

    /// `(path, distance)` pairs of the `k` nearest points, best match first.
    fn nearest(&self, query: &[f64], k: usize) -> Result<Vec<(String, f64)>>;

    /// Paths of every point within `radius` of `query`, in no particular order.
    fn query_range(&self, query: &[f64], radius: f64) -> Result<Vec<String>>;

    fn num_points(&self) -> usize;
}

impl Index for SsTree {
    fn insert(&mut self, point: Point) -> Result<()> {
        SsTree::insert(self, point)
    }

    fn nearest(&self, query: &[f64], k: usize) -> Result<Vec<(String, f64)>> {
        self.query_neighbors_with_distances(query, k)
    }

    fn query_range(&self, query: &[f64], radius: f64) -> Result<Vec<String>> {
        SsTree::query_range(self, query, radius)
    }

    fn num_points(&self) -> usize {
        self.len()
    }
}
