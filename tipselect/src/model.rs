use itertools::Itertools;
use tangle_hashes::BlockId;

/// Index of a milestone, the checkpoints issued by the coordinator
pub type MilestoneIndex = u32;

pub const BLOCK_PARENTS_COUNT: usize = 2;

/// Youngest and oldest milestone indexes referenced by the past cone of a block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConeRootIndexes {
    pub youngest: MilestoneIndex,
    pub oldest: MilestoneIndex,
}

impl ConeRootIndexes {
    pub fn new(youngest: MilestoneIndex, oldest: MilestoneIndex) -> Self {
        Self { youngest, oldest }
    }

    /// Cone root indexes of a block referenced by the milestone at `index`
    pub fn referenced_at(index: MilestoneIndex) -> Self {
        Self { youngest: index, oldest: index }
    }
}

/// A block which became solid, together with the blocks it approves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolidBlock {
    pub id: BlockId,
    pub parents: [BlockId; BLOCK_PARENTS_COUNT],
}

impl SolidBlock {
    pub fn new(id: BlockId, parents: [BlockId; BLOCK_PARENTS_COUNT]) -> Self {
        Self { id, parents }
    }

    /// The approved blocks without repetition. A block may reference the same
    /// parent twice but still counts as a single child.
    pub fn unique_parents(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.parents.iter().copied().unique()
    }
}

/// The two tips a new block should approve. Both may be the same block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedTips(pub BlockId, pub BlockId);

impl SelectedTips {
    pub fn is_distinct(&self) -> bool {
        self.0 != self.1
    }

    pub fn to_array(self) -> [BlockId; BLOCK_PARENTS_COUNT] {
        [self.0, self.1]
    }
}

/// Result of a spammer tip selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpammerTips {
    /// True when the tips were drawn from the semi-lazy pool
    pub semi_lazy: bool,
    pub tips: SelectedTips,
}
