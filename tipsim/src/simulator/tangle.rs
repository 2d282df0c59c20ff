use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
};
use tangle_hashes::{BlockId, EMPTY_BLOCK_ID};
use tangle_tipselect::{
    context::TangleContext,
    errors::{TangleContextError, TangleContextResult},
    model::{ConeRootIndexes, MilestoneIndex, BLOCK_PARENTS_COUNT},
};

struct BlockMeta {
    parents: [BlockId; BLOCK_PARENTS_COUNT],
    referenced_by: Option<MilestoneIndex>,
    /// Cone root indexes while the block is not referenced by a milestone
    cone_root_indexes: ConeRootIndexes,
}

impl BlockMeta {
    fn indexes(&self) -> ConeRootIndexes {
        match self.referenced_by {
            Some(index) => ConeRootIndexes::referenced_at(index),
            None => self.cone_root_indexes,
        }
    }
}

#[derive(Default)]
struct TangleState {
    blocks: HashMap<BlockId, BlockMeta>,
    /// Blocks not referenced by any milestone yet, in attachment order
    unreferenced: Vec<BlockId>,
}

impl TangleState {
    fn cone_root_indexes_of(blocks: &HashMap<BlockId, BlockMeta>, parents: &[BlockId; BLOCK_PARENTS_COUNT]) -> ConeRootIndexes {
        let mut youngest = 0;
        let mut oldest = MilestoneIndex::MAX;
        for parent in parents {
            // Unknown parents are solid entry points, referenced at the start of the tangle
            let indexes = blocks.get(parent).map_or(ConeRootIndexes::referenced_at(0), BlockMeta::indexes);
            youngest = youngest.max(indexes.youngest);
            oldest = oldest.min(indexes.oldest);
        }
        ConeRootIndexes::new(youngest, oldest)
    }
}

/// In-memory tangle tracking which milestone referenced each block
pub struct SimTangle {
    state: RwLock<TangleState>,
    cmi: AtomicU32,
}

impl SimTangle {
    /// Creates a tangle holding a genesis block referenced by milestone 0
    pub fn new() -> Self {
        let mut state = TangleState::default();
        state.blocks.insert(
            EMPTY_BLOCK_ID,
            BlockMeta {
                parents: [EMPTY_BLOCK_ID; BLOCK_PARENTS_COUNT],
                referenced_by: Some(0),
                cone_root_indexes: ConeRootIndexes::referenced_at(0),
            },
        );
        Self { state: RwLock::new(state), cmi: AtomicU32::new(0) }
    }

    pub fn block_count(&self) -> usize {
        self.state.read().blocks.len()
    }

    /// Attaches a new block and returns its cone root indexes
    pub fn attach(&self, block_id: BlockId, parents: [BlockId; BLOCK_PARENTS_COUNT]) -> ConeRootIndexes {
        let mut state = self.state.write();
        let cone_root_indexes = TangleState::cone_root_indexes_of(&state.blocks, &parents);
        if state.blocks.insert(block_id, BlockMeta { parents, referenced_by: None, cone_root_indexes }).is_none() {
            state.unreferenced.push(block_id);
        }
        cone_root_indexes
    }

    /// Confirms a milestone which references the past cone of `milestone`, and returns the
    /// new confirmed milestone index along with the number of newly referenced blocks.
    pub fn confirm_milestone(&self, milestone: BlockId) -> (MilestoneIndex, usize) {
        let mut state = self.state.write();
        let index = self.cmi.load(Ordering::SeqCst) + 1;

        let mut referenced = 0;
        let mut stack = vec![milestone];
        while let Some(block_id) = stack.pop() {
            let Some(meta) = state.blocks.get_mut(&block_id) else {
                continue;
            };
            if meta.referenced_by.is_some() {
                continue;
            }
            meta.referenced_by = Some(index);
            referenced += 1;
            stack.extend(meta.parents);
        }

        // Cone root indexes of the remaining blocks may now include the new milestone.
        // Attachment order is topological, so parents are always updated first.
        let TangleState { blocks, unreferenced } = &mut *state;
        unreferenced.retain(|block_id| blocks.get(block_id).is_some_and(|meta| meta.referenced_by.is_none()));
        for block_id in unreferenced.iter() {
            let Some(parents) = blocks.get(block_id).map(|meta| meta.parents) else {
                continue;
            };
            let indexes = TangleState::cone_root_indexes_of(blocks, &parents);
            if let Some(meta) = blocks.get_mut(block_id) {
                meta.cone_root_indexes = indexes;
            }
        }

        self.cmi.store(index, Ordering::SeqCst);
        (index, referenced)
    }
}

impl Default for SimTangle {
    fn default() -> Self {
        Self::new()
    }
}

impl TangleContext for SimTangle {
    fn cone_root_indexes(&self, block_id: &BlockId, _cmi: MilestoneIndex) -> TangleContextResult<ConeRootIndexes> {
        self.state.read().blocks.get(block_id).map(BlockMeta::indexes).ok_or(TangleContextError::BlockNotFound(*block_id))
    }

    fn confirmed_milestone_index(&self) -> MilestoneIndex {
        self.cmi.load(Ordering::SeqCst)
    }

    fn is_node_synced_within_below_max_depth(&self) -> bool {
        true
    }

    fn is_node_almost_synced(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: u64) -> BlockId {
        BlockId::from_u64_word(i)
    }

    #[test]
    fn test_cone_root_indexes() {
        let tangle = SimTangle::new();
        let a = id(1);
        assert_eq!(tangle.attach(a, [EMPTY_BLOCK_ID, EMPTY_BLOCK_ID]), ConeRootIndexes::referenced_at(0));
        assert_eq!(tangle.confirm_milestone(a), (1, 1));

        let (b, c) = (id(2), id(3));
        tangle.attach(b, [a, EMPTY_BLOCK_ID]);
        tangle.attach(c, [b, b]);
        assert_eq!(tangle.cone_root_indexes(&c, 1), Ok(ConeRootIndexes::new(1, 0)));

        // A milestone referencing `b` only
        assert_eq!(tangle.confirm_milestone(b), (2, 1));
        assert_eq!(tangle.confirm_milestone(id(99)), (3, 0));
        assert_eq!(tangle.cone_root_indexes(&b, 3), Ok(ConeRootIndexes::referenced_at(2)));
        assert_eq!(tangle.cone_root_indexes(&c, 3), Ok(ConeRootIndexes::referenced_at(2)));
        assert_eq!(tangle.confirmed_milestone_index(), 3);
        assert_eq!(tangle.cone_root_indexes(&id(4), 3), Err(TangleContextError::BlockNotFound(id(4))));
        assert_eq!(tangle.block_count(), 4);
    }

    #[test]
    fn test_milestone_references_whole_past_cone() {
        let tangle = SimTangle::new();
        for i in 1..=10 {
            tangle.attach(id(i), [id(i - 1), EMPTY_BLOCK_ID]);
        }
        // The genesis is already referenced
        assert_eq!(tangle.confirm_milestone(id(10)), (1, 10));
        assert_eq!(tangle.confirm_milestone(id(10)), (2, 0));
    }
}
