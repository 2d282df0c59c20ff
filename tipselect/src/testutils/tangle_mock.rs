use crate::{
    context::TangleContext,
    errors::{TangleContextError, TangleContextResult},
    model::{ConeRootIndexes, MilestoneIndex},
};
use parking_lot::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};
use tangle_hashes::BlockId;

/// In-memory tangle with directly settable cone root indexes and sync state
pub(crate) struct TangleMock {
    indexes: RwLock<HashMap<BlockId, ConeRootIndexes>>,
    pruned: RwLock<HashSet<BlockId>>,
    cmi: AtomicU32,
    synced: AtomicBool,
    almost_synced: AtomicBool,
}

impl TangleMock {
    pub(crate) fn new(cmi: MilestoneIndex) -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
            pruned: RwLock::new(HashSet::new()),
            cmi: AtomicU32::new(cmi),
            synced: AtomicBool::new(true),
            almost_synced: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_cone_root_indexes(&self, block_id: BlockId, indexes: ConeRootIndexes) {
        self.indexes.write().insert(block_id, indexes);
    }

    pub(crate) fn get_cone_root_indexes(&self, block_id: &BlockId) -> Option<ConeRootIndexes> {
        self.indexes.read().get(block_id).copied()
    }

    pub(crate) fn prune(&self, block_id: BlockId) {
        self.pruned.write().insert(block_id);
    }

    pub(crate) fn set_cmi(&self, cmi: MilestoneIndex) {
        self.cmi.store(cmi, Ordering::SeqCst);
    }

    pub(crate) fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }

    pub(crate) fn set_almost_synced(&self, almost_synced: bool) {
        self.almost_synced.store(almost_synced, Ordering::SeqCst);
    }
}

impl TangleContext for TangleMock {
    fn cone_root_indexes(&self, block_id: &BlockId, _cmi: MilestoneIndex) -> TangleContextResult<ConeRootIndexes> {
        if self.pruned.read().contains(block_id) {
            return Err(TangleContextError::MetadataPruned(*block_id));
        }
        self.indexes.read().get(block_id).copied().ok_or(TangleContextError::BlockNotFound(*block_id))
    }

    fn confirmed_milestone_index(&self) -> MilestoneIndex {
        self.cmi.load(Ordering::SeqCst)
    }

    fn is_node_synced_within_below_max_depth(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn is_node_almost_synced(&self) -> bool {
        self.almost_synced.load(Ordering::SeqCst)
    }
}
