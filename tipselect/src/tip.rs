use crate::score::Score;
use std::time::Instant;
use tangle_hashes::BlockId;

/// A block which can be approved by newly issued blocks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tip {
    pub block_id: BlockId,
    pub score: Score,

    /// Monotonic instant at which the tip was referenced by its first child.
    /// Only stamped when age based eviction is enabled for the pool.
    pub time_first_child: Option<Instant>,

    /// Number of children which referenced the tip since it entered the pool
    pub children_count: u32,
}

impl Tip {
    pub(crate) fn new(block_id: BlockId, score: Score) -> Self {
        Self { block_id, score, time_first_child: None, children_count: 0 }
    }

    pub fn is_referenced(&self) -> bool {
        self.time_first_child.is_some()
    }
}
