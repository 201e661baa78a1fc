//! Branch-and-bound traversals over the node arena.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::{
    config::SearchMode,
    distance::euclidean,
    node::{Node, NodeKind},
};

/// A point found by a traversal: its distance to the query, the leaf holding it
/// and its position inside that leaf.
pub type Candidate = (OrderedFloat<f64>, usize, usize);

/// Bounded max-heap of the best `k` candidates seen so far. The heap top is the
/// worst of them; its distance is the pruning threshold once the heap is full.
pub struct Neighbors {
    k: usize,
    heap: BinaryHeap<Candidate>,
    kth_distance: f64,
}

impl Neighbors {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Neighbors {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            kth_distance: f64::INFINITY,
        }
    }

    /// Current k-th best distance, infinite until `k` candidates were found.
    #[must_use]
    pub fn kth_distance(&self) -> f64 {
        self.kth_distance
    }

    /// Keeps the candidate while fewer than `k` were found, afterwards only if it
    /// beats the current k-th distance. Overflowed (infinite) distances still fill
    /// an incomplete heap.
    pub fn offer(&mut self, distance: f64, leaf: usize, position: usize) {
        if self.heap.len() == self.k {
            if distance >= self.kth_distance {
                return;
            }
            self.heap.pop();
        }
        self.heap.push((OrderedFloat(distance), leaf, position));
        if self.heap.len() == self.k {
            if let Some((kth, _, _)) = self.heap.peek() {
                self.kth_distance = kth.into_inner();
            }
        }
    }

    /// Drains the heap, worst candidate first.
    #[must_use]
    pub fn into_worst_first(mut self) -> Vec<Candidate> {
        let mut result = Vec::with_capacity(self.heap.len());
        while let Some(candidate) = self.heap.pop() {
            result.push(candidate);
        }
        result
    }
}

/// Depth-first k nearest neighbor traversal rooted at `node_id`.
///
/// Leaf entries are skipped when the reverse triangle inequality against the
/// leaf centroid already proves them farther than the current k-th distance.
/// In [`SearchMode::Pruned`] whole subtrees are skipped the same way using
/// their bounding spheres.
pub fn knn(
    nodes: &[Node],
    node_id: usize,
    query: &[f64],
    mode: SearchMode,
    neighbors: &mut Neighbors,
) {
    let node = &nodes[node_id];
    match &node.kind {
        NodeKind::Leaf(points) => {
            let center = &node.sphere.center;
            let center_to_query = euclidean(center, query);
            for (position, point) in points.iter().enumerate() {
                let center_to_point = euclidean(center, point.coords());
                if (center_to_query - center_to_point).abs() > neighbors.kth_distance() {
                    continue;
                }
                let distance = euclidean(point.coords(), query);
                neighbors.offer(distance, node_id, position);
            }
        }
        NodeKind::Inner(children) => {
            for &child_id in children {
                if mode == SearchMode::Pruned
                    && nodes[child_id].sphere.min_distance(query) > neighbors.kth_distance()
                {
                    continue;
                }
                knn(nodes, child_id, query, mode, neighbors);
            }
        }
    }
}

/// Collects every point within `radius` of `query` as `(leaf, position)` pairs.
pub fn range(
    nodes: &[Node],
    node_id: usize,
    query: &[f64],
    radius: f64,
    result: &mut Vec<(usize, usize)>,
) {
    let node = &nodes[node_id];
    if node.sphere.min_distance(query) > radius {
        return;
    }
    match &node.kind {
        NodeKind::Leaf(points) => {
            for (position, point) in points.iter().enumerate() {
                if euclidean(point.coords(), query) <= radius {
                    result.push((node_id, position));
                }
            }
        }
        NodeKind::Inner(children) => {
            for &child_id in children {
                range(nodes, child_id, query, radius, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Neighbors;

    #[test]
    fn bounded_heap_keeps_best_k() {
        let mut neighbors = Neighbors::new(3);
        assert!(neighbors.kth_distance().is_infinite());

        for (i, distance) in [5.0, 1.0, 4.0, 3.0, 2.0, 6.0].into_iter().enumerate() {
            neighbors.offer(distance, 0, i);
        }
        assert_eq!(neighbors.kth_distance(), 3.0);

        let drained: Vec<f64> = neighbors
            .into_worst_first()
            .into_iter()
            .map(|(distance, _, _)| distance.into_inner())
            .collect();
        assert_eq!(drained, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn threshold_stays_infinite_until_full() {
        let mut neighbors = Neighbors::new(4);
        neighbors.offer(1.0, 0, 0);
        neighbors.offer(2.0, 0, 1);
        assert!(neighbors.kth_distance().is_infinite());
        assert_eq!(neighbors.into_worst_first().len(), 2);
    }

    #[test]
    fn infinite_distances_fill_the_heap() {
        let mut neighbors = Neighbors::new(3);
        neighbors.offer(f64::INFINITY, 0, 0);
        neighbors.offer(f64::INFINITY, 0, 1);
        assert_eq!(neighbors.into_worst_first().len(), 2);

        // Once full, an infinite k-th distance is displaced by finite candidates only
        let mut neighbors = Neighbors::new(2);
        neighbors.offer(f64::INFINITY, 0, 0);
        neighbors.offer(1.0, 0, 1);
        neighbors.offer(f64::INFINITY, 0, 2);
        neighbors.offer(2.0, 0, 3);
        let positions: Vec<usize> = neighbors
            .into_worst_first()
            .into_iter()
            .map(|(_, _, position)| position)
            .collect();
        assert_eq!(positions, vec![3, 1]);
    }
}
