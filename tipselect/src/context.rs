use crate::{
    errors::TangleContextResult,
    model::{ConeRootIndexes, MilestoneIndex},
};
use tangle_hashes::BlockId;

/// The view of the tangle and of the sync state needed by the tip selector.
///
/// Implementations must not call back into the tip selector, all its operations
/// invoke this trait while holding the pool lock.
pub trait TangleContext: Send + Sync {
    /// Returns the youngest and oldest cone root indexes of the block in relation to `cmi`.
    /// Fails if the block metadata is unknown or was already pruned.
    fn cone_root_indexes(&self, block_id: &BlockId, cmi: MilestoneIndex) -> TangleContextResult<ConeRootIndexes>;

    /// The confirmed milestone index (CMI), the reference point for tip scoring
    fn confirmed_milestone_index(&self) -> MilestoneIndex;

    /// Whether the node is synced closely enough for its tips to be safely approved
    fn is_node_synced_within_below_max_depth(&self) -> bool;

    /// Whether the node is synced closely enough for tip maintenance to be worthwhile
    fn is_node_almost_synced(&self) -> bool;
}
