use tangle_hashes::BlockId;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipSelectionError {
    /// The selected pool is empty, or the spammer heuristics declined to pick tips
    #[error("no tips available")]
    NoTipsAvailable,

    #[error("node is not synchronized")]
    NotSynced,
}

pub type TipSelectionResult<T> = std::result::Result<T, TipSelectionError>;

/// Failures of the tangle lookups the tip selector depends on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TangleContextError {
    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("metadata of block {0} was pruned")]
    MetadataPruned(BlockId),
}

pub type TangleContextResult<T> = std::result::Result<T, TangleContextError>;
