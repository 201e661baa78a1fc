use crate::{
    distance::euclidean,
    error::{Result, SsTreeError},
    index::Index,
    point::{check_coords, Point},
    search::Neighbors,
};

/// Brute-force index scanning every point on each query.
pub struct LinearIndex {
    dimension: usize,
    data: Vec<Point>,
}

impl LinearIndex {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SsTreeError::InvalidConfig(
                "dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Index for LinearIndex {
    fn insert(&mut self, point: Point) -> Result<()> {
        check_coords(point.coords(), self.dimension)?;
        self.data.push(point);
        Ok(())
    }

    fn nearest(&self, query: &[f64], k: usize) -> Result<Vec<(String, f64)>> {
        if k == 0 {
            return Err(SsTreeError::InvalidK);
        }
        check_coords(query, self.dimension)?;

        let mut neighbors = Neighbors::new(k);
        for (i, point) in self.data.iter().enumerate() {
            neighbors.offer(euclidean(point.coords(), query), 0, i);
        }
        let mut result: Vec<(String, f64)> = neighbors
            .into_worst_first()
            .into_iter()
            .map(|(distance, _, i)| (self.data[i].path().to_string(), distance.into_inner()))
            .collect();
        result.reverse();
        Ok(result)
    }

    fn query_range(&self, query: &[f64], radius: f64) -> Result<Vec<String>> {
        check_coords(query, self.dimension)?;
        Ok(self
            .data
            .iter()
            .filter(|point| euclidean(point.coords(), query) <= radius)
            .map(|point| point.path().to_string())
            .collect())
    }

    fn num_points(&self) -> usize {
        self.data.len()
    }
}
