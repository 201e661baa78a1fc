use crate::point::Point;
use crate::sphere::Sphere;

/// Sentinel slot id for "no node" (empty root, parent of the root).
pub const NONE: usize = usize::MAX;

#[derive(Clone, Debug)]
pub enum NodeKind {
    Leaf(Vec<Point>),
    Inner(Vec<usize>),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub slot_id: usize,
    pub parent: usize,
    pub sphere: Sphere,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(slot_id: usize, parent: usize, sphere: Sphere, kind: NodeKind) -> Node {
        Node {
            slot_id,
            parent,
            sphere,
            kind,
        }
    }

    #[must_use]
    pub fn leaf(points: Vec<Point>) -> Node {
        Self::new(NONE, NONE, Sphere::default(), NodeKind::Leaf(points))
    }

    #[must_use]
    pub fn inner(children: Vec<usize>) -> Node {
        Self::new(NONE, NONE, Sphere::default(), NodeKind::Inner(children))
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Point count of a leaf, child count of an inner node.
    #[must_use]
    pub fn num_entries(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(points) => points.len(),
            NodeKind::Inner(children) => children.len(),
        }
    }

    #[must_use]
    pub fn children(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Inner(children) => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        match &self.kind {
            NodeKind::Leaf(points) => points,
            NodeKind::Inner(_) => &[],
        }
    }
}
