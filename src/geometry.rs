//! Variance and centroid computations shared by leaves and inner nodes.
//!
//! Every function takes the node's representative points: stored points for a
//! leaf, child centroids for an inner node. Callers guarantee the slices are
//! non-empty, which holds for every node of a valid tree.

use conv::ValueFrom;
use ordered_float::OrderedFloat;

fn count<P>(values: &[P]) -> f64 {
    f64::value_from(values.len()).unwrap_or(f64::MAX)
}

/// Arithmetic mean of the values, axis by axis.
pub fn centroid_of<P: AsRef<[f64]>>(values: &[P], dimension: usize) -> Vec<f64> {
    let mut centroid = vec![0.0; dimension];
    for value in values {
        for (c, x) in centroid.iter_mut().zip(value.as_ref()) {
            *c += x;
        }
    }
    let n = count(values);
    for c in &mut centroid {
        *c /= n;
    }
    centroid
}

/// Population variance of the `axis`-th coordinate.
pub fn variance_along_axis<P: AsRef<[f64]>>(values: &[P], axis: usize) -> f64 {
    let n = count(values);
    let mean = values.iter().map(|v| v.as_ref()[axis]).sum::<f64>() / n;
    values
        .iter()
        .map(|v| (v.as_ref()[axis] - mean).powi(2))
        .sum::<f64>()
        / n
}

/// Axis with the strictly greatest variance; axis 0 wins ties.
pub fn axis_of_max_variance<P: AsRef<[f64]>>(values: &[P], dimension: usize) -> usize {
    let mut axis = 0;
    let mut max_variance = 0.0;
    for i in 0..dimension {
        let variance = variance_along_axis(values, i);
        if variance > max_variance {
            max_variance = variance;
            axis = i;
        }
    }
    axis
}

/// Sorts `entries` ascending by the coordinate `key` extracts; equal keys keep their order.
pub fn sort_along_axis<T>(entries: &mut [T], key: impl Fn(&T) -> f64) {
    entries.sort_by_key(|entry| OrderedFloat(key(entry)));
}

/// Scans split positions `i` in `[min_fanout, max_fanout - min_fanout]` over values
/// already sorted along `axis` and returns the one minimizing
/// `variance(values[..i]) + variance(values[i..])`. The first minimum wins.
pub fn find_split_index<P: AsRef<[f64]>>(
    values: &[P],
    axis: usize,
    min_fanout: usize,
    max_fanout: usize,
) -> usize {
    let mut split_index = min_fanout;
    let mut min_variance = f64::INFINITY;
    for i in min_fanout..=max_fanout - min_fanout {
        let (left, right) = values.split_at(i);
        let variance = variance_along_axis(left, axis) + variance_along_axis(right, axis);
        if variance < min_variance {
            min_variance = variance;
            split_index = i;
        }
    }
    split_index
}

#[cfg(test)]
mod tests {
    use super::{
        axis_of_max_variance, centroid_of, find_split_index, sort_along_axis, variance_along_axis,
    };
    use approx::assert_relative_eq;

    #[test]
    fn centroid() {
        let values = vec![vec![0.0, 0.0], vec![0.0, 2.0], vec![2.0, 0.0], vec![2.0, 2.0]];
        assert_eq!(centroid_of(&values, 2), vec![1.0, 1.0]);
    }

    #[test]
    fn population_variance() {
        let values = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        assert_relative_eq!(variance_along_axis(&values, 0), 1.25);

        let single = vec![vec![7.0]];
        assert_eq!(variance_along_axis(&single, 0), 0.0);
    }

    #[test]
    fn max_variance_axis() {
        let values = vec![vec![0.0, 0.0, 5.0], vec![1.0, 10.0, 5.0], vec![2.0, -10.0, 5.0]];
        assert_eq!(axis_of_max_variance(&values, 3), 1);

        // All-zero variance resolves to the first axis.
        let flat = vec![vec![3.0, 3.0], vec![3.0, 3.0]];
        assert_eq!(axis_of_max_variance(&flat, 2), 0);
    }

    #[test]
    fn split_index_separates_clusters() {
        let mut values = vec![
            vec![10.0],
            vec![0.0],
            vec![11.0],
            vec![1.0],
            vec![12.0],
            vec![2.0],
        ];
        sort_along_axis(&mut values, |v| v[0]);
        assert_eq!(values[0], vec![0.0]);
        assert_eq!(values[5], vec![12.0]);

        // m = 2, M = 5: candidates are 2 and 3, the gap sits at 3.
        assert_eq!(find_split_index(&values, 0, 2, 5), 3);
    }

    #[test]
    fn split_index_ties_keep_first() {
        let values = vec![vec![1.0]; 6];
        assert_eq!(find_split_index(&values, 0, 2, 5), 2);
    }
}
