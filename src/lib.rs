//! Similarity search tree (SS-tree): a height-balanced index of points in
//! D-dimensional Euclidean space, answering k nearest neighbor and range
//! queries, with a compact binary file format.

mod codec;
mod config;
mod distance;
mod error;
mod geometry;
mod index;
#[allow(clippy::module_name_repetitions)]
mod linear;
mod node;
mod point;
mod search;
mod slots;
mod sphere;
mod sstree;
mod validate;

pub use config::{Config, SearchMode};
pub use error::{Result, SsTreeError};
pub use index::Index;
pub use linear::LinearIndex;
pub use point::Point;
pub use sstree::SsTree;
pub use validate::Violation;
