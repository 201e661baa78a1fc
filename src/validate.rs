//! Structural invariant checks.

use thiserror::Error;
use tracing::debug;

use crate::{
    distance::euclidean,
    node::{NodeKind, NONE},
    sphere::Sphere,
    sstree::SsTree,
};

/// Relative slack allowed on containment checks. Trees read back from disk carry
/// `f32`-rounded points, centroids and radii.
const TOLERANCE: f64 = 1e-4;

// Scales with the radius and with the magnitude of the centroid coordinates.
fn slack(sphere: &Sphere) -> f64 {
    let magnitude = sphere.center.iter().fold(1.0, |acc: f64, x| acc.max(x.abs()));
    TOLERANCE * magnitude.max(sphere.radius)
}

/// First structural violation found in a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("node {node} has no entries")]
    EmptyNode { node: usize },

    #[error("node {node} has dimension {actual}, tree has {expected}")]
    DimensionMismatch {
        node: usize,
        expected: usize,
        actual: usize,
    },

    #[error("point {position} of leaf {node} lies at {distance} from the centroid, radius is {radius}")]
    PointOutsideSphere {
        node: usize,
        position: usize,
        distance: f64,
        radius: f64,
    },

    #[error("child {child} of node {node} reaches {reach} from the centroid, radius is {radius}")]
    ChildOutsideSphere {
        node: usize,
        child: usize,
        reach: f64,
        radius: f64,
    },

    #[error("node {node} has {count} entries, expected between {min} and {max}")]
    EntryCount {
        node: usize,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("node {node} has no parent")]
    MissingParent { node: usize },

    #[error("node {node} points to parent {actual}, but is owned by {expected}")]
    WrongParent {
        node: usize,
        expected: usize,
        actual: usize,
    },

    #[error("root node {node} has parent {parent}")]
    RootHasParent { node: usize, parent: usize },

    #[error("inner node {node} mixes leaf and inner children")]
    MixedChildren { node: usize },

    #[error("leaf {node} lies at depth {depth}, other leaves at depth {expected}")]
    UnevenLeafDepth {
        node: usize,
        depth: usize,
        expected: usize,
    },
}

impl SsTree {
    /// Checks every structural invariant of the tree and reports the first violation.
    ///
    /// The root is exempt from the entry-count bounds and must not have a parent;
    /// every other node must link back to its owner.
    pub fn validate(&self) -> Result<(), Violation> {
        if self.root == NONE {
            return Ok(());
        }
        let mut leaf_depth = None;
        let result = self.validate_node(self.root, NONE, 0, &mut leaf_depth);
        if let Err(violation) = &result {
            debug!(%violation, "tree failed validation");
        }
        result
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn validate_node(
        &self,
        node_id: usize,
        owner: usize,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> Result<(), Violation> {
        let node = &self.nodes[node_id];
        let is_root = owner == NONE;
        let count = node.num_entries();

        if count == 0 {
            return Err(Violation::EmptyNode { node: node_id });
        }
        if node.sphere.center.len() != self.dimension {
            return Err(Violation::DimensionMismatch {
                node: node_id,
                expected: self.dimension,
                actual: node.sphere.center.len(),
            });
        }

        if is_root {
            if node.parent != NONE {
                return Err(Violation::RootHasParent {
                    node: node_id,
                    parent: node.parent,
                });
            }
        } else {
            if node.parent == NONE {
                return Err(Violation::MissingParent { node: node_id });
            }
            if node.parent != owner {
                return Err(Violation::WrongParent {
                    node: node_id,
                    expected: owner,
                    actual: node.parent,
                });
            }
            let (min, max) = (self.config.min_fanout(), self.config.max_fanout());
            if count < min || count > max {
                return Err(Violation::EntryCount {
                    node: node_id,
                    count,
                    min,
                    max,
                });
            }
        }

        let center = &node.sphere.center;
        let radius = node.sphere.radius;
        let limit = radius + slack(&node.sphere);
        match &node.kind {
            NodeKind::Leaf(points) => {
                match *leaf_depth {
                    Some(expected) if expected != depth => {
                        return Err(Violation::UnevenLeafDepth {
                            node: node_id,
                            depth,
                            expected,
                        });
                    }
                    _ => *leaf_depth = Some(depth),
                }
                for (position, point) in points.iter().enumerate() {
                    if point.dim() != self.dimension {
                        return Err(Violation::DimensionMismatch {
                            node: node_id,
                            expected: self.dimension,
                            actual: point.dim(),
                        });
                    }
                    let distance = euclidean(center, point.coords());
                    if distance > limit {
                        return Err(Violation::PointOutsideSphere {
                            node: node_id,
                            position,
                            distance,
                            radius,
                        });
                    }
                }
            }
            NodeKind::Inner(children) => {
                let children_are_leaves = self.nodes[children[0]].is_leaf();
                for &child_id in children {
                    let child = &self.nodes[child_id];
                    if child.is_leaf() != children_are_leaves {
                        return Err(Violation::MixedChildren { node: node_id });
                    }
                    let reach = child.sphere.max_distance(center);
                    if reach > limit {
                        return Err(Violation::ChildOutsideSphere {
                            node: node_id,
                            child: child_id,
                            reach,
                            radius,
                        });
                    }
                    self.validate_node(child_id, node_id, depth + 1, leaf_depth)?;
                }
            }
        }
        Ok(())
    }
}
