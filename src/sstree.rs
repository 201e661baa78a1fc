use std::fmt;

use tracing::{debug, trace};

use crate::{
    config::Config,
    distance::euclidean,
    error::{Result, SsTreeError},
    geometry::{axis_of_max_variance, centroid_of, find_split_index, sort_along_axis},
    node::{Node, NodeKind, NONE},
    point::{check_coords, Point},
    search::{self, Neighbors},
    slots::Slots,
    sphere::Sphere,
};

/// Similarity search tree over `dimension`-dimensional points.
///
/// Leaves hold points, inner nodes hold child nodes, and every node keeps a
/// bounding sphere around its entries. Nodes live in an arena addressed by slot
/// ids; parent links are slot ids as well, so ownership stays strictly
/// hierarchical.
pub struct SsTree {
    pub(crate) dimension: usize,
    pub(crate) config: Config,
    pub(crate) root: usize,
    pub(crate) num_points: usize,
    pub(crate) nodes: Vec<Node>,
    slots: Slots,
}

impl SsTree {
    pub fn new(dimension: usize, config: Config) -> Result<Self> {
        if dimension == 0 {
            return Err(SsTreeError::InvalidConfig(
                "dimension must be at least 1".to_string(),
            ));
        }
        Ok(SsTree {
            dimension,
            config,
            root: NONE,
            num_points: 0,
            nodes: Vec::new(),
            slots: Slots::new(),
        })
    }

    /// Inserts a point carrying its own payload identifier.
    pub fn insert(&mut self, point: Point) -> Result<()> {
        check_coords(point.coords(), self.dimension)?;

        if self.root == NONE {
            let root = self.add_slot(Node::leaf(vec![point]));
            self.reshape(root);
            self.root = root;
        } else if let Some((left, right)) = self.insert_recursive(self.root, point) {
            // The root overflowed: grow the tree by one level
            let root = self.add_slot(Node::inner(vec![left, right]));
            self.nodes[left].parent = root;
            self.nodes[right].parent = root;
            self.reshape(root);
            self.root = root;
            debug!(height = self.height(), "promoted new root");
        }
        self.num_points += 1;
        Ok(())
    }

    /// Inserts `coords` with the payload identifier `path`, stored as given.
    pub fn insert_with_path(&mut self, coords: Vec<f64>, path: impl Into<String>) -> Result<()> {
        self.insert(Point::with_path(coords, path))
    }

    /// Inserts the points one by one, stopping at the first invalid point.
    pub fn build(&mut self, points: impl IntoIterator<Item = Point>) -> Result<()> {
        for point in points {
            self.insert(point)?;
        }
        Ok(())
    }

    /// Payload identifiers of the `k` nearest points, worst match first
    /// (the order in which the candidate heap drains).
    pub fn query_neighbors(&self, query: &[f64], k: usize) -> Result<Vec<String>> {
        Ok(self
            .search_neighbors(query, k)?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    /// Payload identifiers of the `k` nearest points, best match first.
    pub fn query_neighbors_sorted(&self, query: &[f64], k: usize) -> Result<Vec<String>> {
        let mut paths = self.query_neighbors(query, k)?;
        paths.reverse();
        Ok(paths)
    }

    /// `(path, distance)` pairs of the `k` nearest points, best match first.
    pub fn query_neighbors_with_distances(
        &self,
        query: &[f64],
        k: usize,
    ) -> Result<Vec<(String, f64)>> {
        let mut neighbors = self.search_neighbors(query, k)?;
        neighbors.reverse();
        Ok(neighbors)
    }

    /// Payload identifiers of every point within `radius` of `query`.
    pub fn query_range(&self, query: &[f64], radius: f64) -> Result<Vec<String>> {
        check_coords(query, self.dimension)?;
        let mut found = Vec::new();
        if self.root != NONE {
            search::range(&self.nodes, self.root, query, radius, &mut found);
        }
        Ok(found
            .into_iter()
            .map(|(leaf, position)| self.nodes[leaf].points()[position].path().to_string())
            .collect())
    }

    fn search_neighbors(&self, query: &[f64], k: usize) -> Result<Vec<(String, f64)>> {
        if k == 0 {
            return Err(SsTreeError::InvalidK);
        }
        check_coords(query, self.dimension)?;
        if self.root == NONE {
            return Ok(Vec::new());
        }

        let mut neighbors = Neighbors::new(k);
        search::knn(
            &self.nodes,
            self.root,
            query,
            self.config.search_mode(),
            &mut neighbors,
        );
        Ok(neighbors
            .into_worst_first()
            .into_iter()
            .map(|(distance, leaf, position)| {
                let path = self.nodes[leaf].points()[position].path().to_string();
                (path, distance.into_inner())
            })
            .collect())
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.num_points
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Number of live nodes, leaves included.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.slots.num_live()
    }

    /// Number of levels; a single leaf root has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while current != NONE {
            height += 1;
            current = self.nodes[current].children().first().copied().unwrap_or(NONE);
        }
        height
    }

    #[must_use]
    pub fn root_radius(&self) -> Option<f64> {
        self.nodes.get(self.root).map(|root| root.sphere.radius)
    }

    /// Radii of all nodes `depth` levels below the root (the root is depth 0).
    #[must_use]
    pub fn radii_at_depth(&self, depth: usize) -> Vec<f64> {
        let mut level = if self.root == NONE {
            Vec::new()
        } else {
            vec![self.root]
        };
        for _ in 0..depth {
            level = level
                .iter()
                .flat_map(|&node_id| self.nodes[node_id].children().iter().copied())
                .collect();
        }
        level
            .iter()
            .map(|&node_id| self.nodes[node_id].sphere.radius)
            .collect()
    }

    // Insert a point below `node_id`.
    // Returns the two halves when `node_id` overflowed and was split.
    fn insert_recursive(&mut self, node_id: usize, point: Point) -> Option<(usize, usize)> {
        if self.nodes[node_id].is_leaf() {
            if let NodeKind::Leaf(points) = &mut self.nodes[node_id].kind {
                points.push(point);
            }
            self.reshape(node_id);
            if self.nodes[node_id].num_entries() > self.config.max_fanout() {
                return Some(self.split(node_id));
            }
            return None;
        }

        let closest_child = self.choose_subtree(node_id, point.coords());
        trace!(node = node_id, child = closest_child, "descend");
        if let Some((left, right)) = self.insert_recursive(closest_child, point) {
            if let NodeKind::Inner(children) = &mut self.nodes[node_id].kind {
                children.retain(|&child| child != closest_child);
                children.push(left);
                children.push(right);
            }
            self.nodes[left].parent = node_id;
            self.nodes[right].parent = node_id;
            if self.nodes[node_id].num_entries() > self.config.max_fanout() {
                return Some(self.split(node_id));
            }
        }
        self.reshape(node_id);
        None
    }

    // The child whose centroid is nearest to the point; the first one wins ties.
    fn choose_subtree(&self, node_id: usize, point: &[f64]) -> usize {
        let mut best_distance = f64::INFINITY;
        let mut best_child = NONE;
        for &child_id in self.nodes[node_id].children() {
            let distance = euclidean(&self.nodes[child_id].sphere.center, point);
            if distance < best_distance {
                best_distance = distance;
                best_child = child_id;
            }
        }
        best_child
    }

    // Replace an overflowing node by two new siblings of the same kind.
    // The siblings' parent is left for the caller to set.
    fn split(&mut self, node_id: usize) -> (usize, usize) {
        let kind = std::mem::replace(&mut self.nodes[node_id].kind, NodeKind::Inner(Vec::new()));
        let (min_fanout, max_fanout) = (self.config.min_fanout(), self.config.max_fanout());

        let (left_kind, right_kind) = match kind {
            NodeKind::Leaf(mut points) => {
                let coords: Vec<&[f64]> = points.iter().map(Point::coords).collect();
                let axis = axis_of_max_variance(&coords, self.dimension);
                sort_along_axis(&mut points, |point| point.coords()[axis]);

                let coords: Vec<&[f64]> = points.iter().map(Point::coords).collect();
                let split_index = find_split_index(&coords, axis, min_fanout, max_fanout);
                let right = points.split_off(split_index + 1);
                (NodeKind::Leaf(points), NodeKind::Leaf(right))
            }
            NodeKind::Inner(mut children) => {
                let centers = self.child_centers(&children);
                let axis = axis_of_max_variance(&centers, self.dimension);
                sort_along_axis(&mut children, |&child| self.nodes[child].sphere.center[axis]);

                let centers = self.child_centers(&children);
                let split_index = find_split_index(&centers, axis, min_fanout, max_fanout);
                let right = children.split_off(split_index + 1);
                (NodeKind::Inner(children), NodeKind::Inner(right))
            }
        };

        let left = self.add_slot(Node::new(NONE, NONE, Sphere::default(), left_kind));
        let right = self.add_slot(Node::new(NONE, NONE, Sphere::default(), right_kind));
        for half in [left, right] {
            for child_id in self.nodes[half].children().to_vec() {
                self.nodes[child_id].parent = half;
            }
            self.reshape(half);
        }
        self.delete_slot(node_id);

        debug!(
            node = node_id,
            leaf = self.nodes[left].is_leaf(),
            left_entries = self.nodes[left].num_entries(),
            right_entries = self.nodes[right].num_entries(),
            "split node"
        );
        (left, right)
    }

    fn child_centers(&self, children: &[usize]) -> Vec<&[f64]> {
        children
            .iter()
            .map(|&child_id| self.nodes[child_id].sphere.center.as_slice())
            .collect()
    }

    // Recompute the bounding sphere of a node from its current entries.
    pub(crate) fn reshape(&mut self, node_id: usize) {
        let sphere = self.calculate_sphere(node_id);
        self.nodes[node_id].sphere = sphere;
    }

    fn calculate_sphere(&self, node_id: usize) -> Sphere {
        match &self.nodes[node_id].kind {
            NodeKind::Leaf(points) => {
                let coords: Vec<&[f64]> = points.iter().map(Point::coords).collect();
                let center = centroid_of(&coords, self.dimension);
                let radius = coords
                    .iter()
                    .map(|point| euclidean(&center, point))
                    .fold(0.0, f64::max);
                Sphere::new(center, radius)
            }
            NodeKind::Inner(children) => {
                // Every child weighs the same, whatever the number of points below it
                let center = centroid_of(&self.child_centers(children), self.dimension);
                let radius = children
                    .iter()
                    .map(|&child_id| self.nodes[child_id].sphere.max_distance(&center))
                    .fold(0.0, f64::max);
                Sphere::new(center, radius)
            }
        }
    }

    pub(crate) fn add_slot(&mut self, mut node: Node) -> usize {
        let slot_id = self.slots.insert();
        node.slot_id = slot_id;
        if slot_id == self.nodes.len() {
            self.nodes.push(node);
        } else {
            self.nodes[slot_id] = node;
        }
        slot_id
    }

    fn delete_slot(&mut self, slot_id: usize) {
        self.slots.delete(slot_id);
        self.nodes[slot_id] = Node::inner(Vec::new());
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node_id: usize, depth: usize) -> fmt::Result {
        let node = &self.nodes[node_id];
        write!(
            f,
            "{:indent$}centroid: {:?}, radius: {}",
            "",
            node.sphere.center,
            node.sphere.radius,
            indent = 2 * depth
        )?;
        match &node.kind {
            NodeKind::Leaf(points) => {
                let paths: Vec<&str> = points.iter().map(Point::path).collect();
                writeln!(f, ", points: {paths:?}")
            }
            NodeKind::Inner(children) => {
                writeln!(f)?;
                for &child_id in children {
                    self.fmt_node(f, child_id, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Indented dump of the tree, one node per line.
impl fmt::Display for SsTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root == NONE {
            return writeln!(f, "empty tree");
        }
        self.fmt_node(f, self.root, 0)
    }
}

impl fmt::Debug for SsTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsTree")
            .field("dimension", &self.dimension)
            .field("config", &self.config)
            .field("num_points", &self.num_points)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
