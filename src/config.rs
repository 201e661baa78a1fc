use crate::error::{Result, SsTreeError};

/// How the k nearest neighbor traversal treats inner nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Visit every child of every inner node; only leaf entries are pruned.
    #[default]
    Exhaustive,
    /// Also skip subtrees whose bounding sphere lies farther than the current k-th distance.
    Pruned,
}

/// Fan-out bounds and search behavior of a tree. Immutable once the tree is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    min_fanout: usize,
    max_fanout: usize,
    search_mode: SearchMode,
}

impl Config {
    /// Non-root nodes hold between `min_fanout` and `max_fanout` entries.
    /// Requires `1 <= min_fanout` and `2 * min_fanout <= max_fanout`.
    pub fn new(min_fanout: usize, max_fanout: usize) -> Result<Self> {
        if min_fanout == 0 {
            return Err(SsTreeError::InvalidConfig(
                "min_fanout must be at least 1".to_string(),
            ));
        }
        if min_fanout.saturating_mul(2) > max_fanout {
            return Err(SsTreeError::InvalidConfig(format!(
                "min_fanout {min_fanout} must be at most half of max_fanout {max_fanout}"
            )));
        }
        Ok(Config {
            min_fanout,
            max_fanout,
            search_mode: SearchMode::default(),
        })
    }

    #[must_use]
    pub fn with_search_mode(mut self, search_mode: SearchMode) -> Self {
        self.search_mode = search_mode;
        self
    }

    #[must_use]
    pub fn min_fanout(&self) -> usize {
        self.min_fanout
    }

    #[must_use]
    pub fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    #[must_use]
    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_fanout: 2,
            max_fanout: 5,
            search_mode: SearchMode::Exhaustive,
        }
    }
}
