//! Binary persistence of a tree.
//!
//! All integers and floats are little-endian and fixed-width, written
//! depth-first with no padding:
//!
//! ```text
//! header:  dimension u64 | root_is_leaf u8
//! node:    centroid D x f32 | radius f32 | body
//! leaf:    point_count u64 | point_count x (D x f32)
//!          | path_count u64 | path_count x (length u64 | bytes)
//! inner:   children_are_leaves u8 | child_count u64 | child_count x node
//! ```
//!
//! Coordinates are `f64` in memory and `f32` on disk.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use tracing::info;

use crate::{
    config::Config,
    error::{Result, SsTreeError},
    node::{Node, NodeKind, NONE},
    point::Point,
    sphere::Sphere,
    sstree::SsTree,
};

/// Nesting limit when reading; far above the height of any tree that fits in memory.
const MAX_DEPTH: usize = 128;

impl SsTree {
    /// Writes the tree to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            points = self.len(),
            nodes = self.num_nodes(),
            "saved tree"
        );
        Ok(())
    }

    /// Reads a tree from `path`. Fan-out bounds are not stored in the file and come
    /// from `config`. The loaded tree is not validated.
    pub fn load(path: impl AsRef<Path>, config: Config) -> Result<SsTree> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let tree = Self::read_from(&mut reader, config)?;
        info!(
            path = %path.display(),
            points = tree.len(),
            nodes = tree.num_nodes(),
            "loaded tree"
        );
        Ok(tree)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.root == NONE {
            return Err(SsTreeError::EmptyTree);
        }
        write_u64(&mut writer, self.dimension)?;
        write_bool(&mut writer, self.nodes[self.root].is_leaf())?;
        self.write_node(&mut writer, self.root)
    }

    pub fn read_from<R: Read>(mut reader: R, config: Config) -> Result<SsTree> {
        let dimension = read_count(&mut reader)?;
        if dimension == 0 {
            return Err(SsTreeError::Format("dimension is 0".to_string()));
        }
        let root_is_leaf = read_bool(&mut reader)?;

        let mut tree = SsTree::new(dimension, config)?;
        tree.root = tree.read_node(&mut reader, root_is_leaf, NONE, 0)?;

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(SsTreeError::Format(
                "trailing bytes after the root node".to_string(),
            ));
        }
        Ok(tree)
    }

    fn write_node<W: Write>(&self, writer: &mut W, node_id: usize) -> Result<()> {
        let node = &self.nodes[node_id];
        write_coords(writer, &node.sphere.center)?;
        write_f32(writer, node.sphere.radius)?;

        match &node.kind {
            NodeKind::Leaf(points) => {
                write_u64(writer, points.len())?;
                for point in points {
                    write_coords(writer, point.coords())?;
                }
                write_u64(writer, points.len())?;
                for point in points {
                    write_u64(writer, point.path().len())?;
                    writer.write_all(point.path().as_bytes())?;
                }
            }
            NodeKind::Inner(children) => {
                let children_are_leaves = children
                    .first()
                    .map_or(false, |&child| self.nodes[child].is_leaf());
                write_bool(writer, children_are_leaves)?;
                write_u64(writer, children.len())?;
                for &child in children {
                    self.write_node(writer, child)?;
                }
            }
        }
        Ok(())
    }

    // Read one node and its subtree, linking it to `parent`.
    fn read_node<R: Read>(
        &mut self,
        reader: &mut R,
        is_leaf: bool,
        parent: usize,
        depth: usize,
    ) -> Result<usize> {
        if depth > MAX_DEPTH {
            return Err(SsTreeError::Format(format!(
                "nodes nested deeper than {MAX_DEPTH} levels"
            )));
        }
        let center = read_coords(reader, self.dimension)?;
        let radius = f64::from(read_f32(reader)?);
        let sphere = Sphere::new(center, radius);

        if is_leaf {
            let point_count = read_count(reader)?;
            let mut coords = Vec::new();
            for _ in 0..point_count {
                coords.push(read_coords(reader, self.dimension)?);
            }
            let path_count = read_count(reader)?;
            if path_count != point_count {
                return Err(SsTreeError::Format(format!(
                    "leaf has {point_count} points but {path_count} paths"
                )));
            }
            let mut points = Vec::with_capacity(coords.len());
            for coords in coords {
                points.push(Point::with_path(coords, read_path(reader)?));
            }
            self.num_points += points.len();
            let node = Node::new(NONE, parent, sphere, NodeKind::Leaf(points));
            return Ok(self.add_slot(node));
        }

        let children_are_leaves = read_bool(reader)?;
        let child_count = read_count(reader)?;
        if child_count == 0 {
            return Err(SsTreeError::Format(
                "inner node without children".to_string(),
            ));
        }
        let node_id = self.add_slot(Node::new(NONE, parent, sphere, NodeKind::Inner(Vec::new())));
        let mut children = Vec::new();
        for _ in 0..child_count {
            children.push(self.read_node(reader, children_are_leaves, node_id, depth + 1)?);
        }
        self.nodes[node_id].kind = NodeKind::Inner(children);
        Ok(node_id)
    }
}

fn write_u64<W: Write>(writer: &mut W, value: usize) -> Result<()> {
    let value = u64::try_from(value)
        .map_err(|_| SsTreeError::Format(format!("{value} does not fit in 64 bits")))?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<()> {
    writer.write_all(&[u8::from(value)])?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn write_f32<W: Write>(writer: &mut W, value: f64) -> Result<()> {
    let narrowed = value as f32;
    if !narrowed.is_finite() {
        return Err(SsTreeError::Format(format!("{value} is out of f32 range")));
    }
    writer.write_all(&narrowed.to_le_bytes())?;
    Ok(())
}

fn write_coords<W: Write>(writer: &mut W, coords: &[f64]) -> Result<()> {
    for &x in coords {
        write_f32(writer, x)?;
    }
    Ok(())
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

fn read_count<R: Read>(reader: &mut R) -> Result<usize> {
    let value = u64::from_le_bytes(read_array(reader)?);
    usize::try_from(value)
        .map_err(|_| SsTreeError::Format(format!("count {value} does not fit in memory")))
}

fn read_bool<R: Read>(reader: &mut R) -> Result<bool> {
    match read_array::<R, 1>(reader)?[0] {
        0 => Ok(false),
        1 => Ok(true),
        byte => Err(SsTreeError::Format(format!("invalid boolean byte {byte}"))),
    }
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    let value = f32::from_le_bytes(read_array(reader)?);
    if !value.is_finite() {
        return Err(SsTreeError::Format(format!("non-finite value {value}")));
    }
    Ok(value)
}

fn read_coords<R: Read>(reader: &mut R, dimension: usize) -> Result<Vec<f64>> {
    let mut coords = Vec::new();
    for _ in 0..dimension {
        coords.push(f64::from(read_f32(reader)?));
    }
    Ok(coords)
}

fn read_path<R: Read>(reader: &mut R) -> Result<String> {
    let length = read_count(reader)?;
    let mut bytes = Vec::new();
    reader
        .by_ref()
        .take(length as u64)
        .read_to_end(&mut bytes)?;
    if bytes.len() != length {
        return Err(SsTreeError::Format("unexpected end of input".to_string()));
    }
    String::from_utf8(bytes).map_err(|e| SsTreeError::Format(format!("path is not UTF-8: {e}")))
}

fn truncated(error: io::Error) -> SsTreeError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        SsTreeError::Format("unexpected end of input".to_string())
    } else {
        SsTreeError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::read_bool;
    use crate::{config::Config, error::SsTreeError, point::Point, sstree::SsTree};

    // Coordinates representable in f32, so a round trip through the file is exact.
    fn random_tree(n: usize, dimension: usize, seed: u64) -> SsTree {
        let mut tree = SsTree::new(dimension, Config::default()).expect("Invalid dimension");
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..n {
            let coords = (0..dimension)
                .map(|_| f64::from(rng.gen_range(-10.0f32..10.0)))
                .collect();
            tree.insert_with_path(coords, format!("data/{i}.jpg"))
                .expect("Valid point");
        }
        tree
    }

    fn encode(tree: &SsTree) -> Vec<u8> {
        let mut bytes = Vec::new();
        tree.write_to(&mut bytes).expect("Non-empty tree");
        bytes
    }

    #[test]
    fn single_leaf_layout() {
        let mut tree = SsTree::new(2, Config::default()).expect("Invalid dimension");
        tree.insert(Point::with_path(vec![1.0, 2.0], "ab"))
            .expect("Valid point");
        let bytes = encode(&tree);

        let mut expected = Vec::new();
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.push(1);
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&2.0f32.to_le_bytes());
        expected.extend_from_slice(&0.0f32.to_le_bytes());
        expected.extend_from_slice(&1u64.to_le_bytes());
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&2.0f32.to_le_bytes());
        expected.extend_from_slice(&1u64.to_le_bytes());
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(b"ab");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn stream_round_trip() {
        let tree = random_tree(300, 8, 0);
        assert!(tree.height() >= 2);
        let bytes = encode(&tree);

        let loaded = SsTree::read_from(bytes.as_slice(), Config::default()).expect("Valid bytes");
        assert_eq!(loaded.dimension(), 8);
        assert_eq!(loaded.len(), tree.len());
        assert_eq!(loaded.height(), tree.height());
        assert_eq!(loaded.num_nodes(), tree.num_nodes());
        assert_eq!(loaded.validate(), Ok(()));

        // Writing the loaded tree again yields the same bytes
        assert_eq!(encode(&loaded), bytes);
    }

    #[test]
    fn empty_tree_cannot_be_written() {
        let tree = SsTree::new(2, Config::default()).expect("Invalid dimension");
        let mut bytes = Vec::new();
        assert!(matches!(
            tree.write_to(&mut bytes),
            Err(SsTreeError::EmptyTree)
        ));
    }

    #[test]
    fn every_truncation_fails() {
        let bytes = encode(&random_tree(40, 3, 1));
        for len in 0..bytes.len() {
            let result = SsTree::read_from(&bytes[..len], Config::default());
            assert!(
                matches!(result, Err(SsTreeError::Format(_))),
                "truncation at {len} was accepted"
            );
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let bytes = encode(&random_tree(40, 3, 2));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            SsTree::read_from(trailing.as_slice(), Config::default()),
            Err(SsTreeError::Format(_))
        ));

        let mut bad_flag = bytes.clone();
        bad_flag[8] = 7;
        assert!(matches!(
            SsTree::read_from(bad_flag.as_slice(), Config::default()),
            Err(SsTreeError::Format(_))
        ));

        let mut zero_dimension = bytes;
        zero_dimension[..8].copy_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            SsTree::read_from(zero_dimension.as_slice(), Config::default()),
            Err(SsTreeError::Format(_))
        ));
    }

    #[test]
    fn boolean_bytes() {
        assert!(!read_bool(&mut [0u8].as_slice()).expect("Valid byte"));
        assert!(read_bool(&mut [1u8].as_slice()).expect("Valid byte"));
        assert!(read_bool(&mut [2u8].as_slice()).is_err());
    }
}
