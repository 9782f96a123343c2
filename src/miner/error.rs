//! Miner error types.

use crate::chain::ChainError;
use crate::consensus::EngineError;
use crate::pool::PoolError;
use alloy_primitives::B256;
use thiserror::Error;

/// Reasons a candidate fruit is skipped during selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FruitError {
    /// Fast-number not strictly above the last number embedded in the
    /// parent block.
    #[error("fruit fast-number {fast_number} not above last embedded {last}")]
    InvalidFruitNumber {
        /// The fruit's fast-number.
        fast_number: u64,
        /// The parent block's last embedded fast-number.
        last: u64,
    },

    /// The fruit's pointer hash does not resolve to a known chain block.
    #[error("fruit pointer {0} unknown to the chain")]
    InvalidPointer(B256),

    /// The fruit's pointer is too deep below the candidate.
    #[error("fruit pointer stale: candidate {number}, pointer at {pointer_number}")]
    FreshnessExceeded {
        /// Candidate header number.
        number: u64,
        /// Resolved pointer block number.
        pointer_number: u64,
    },
}

/// Reasons a proposed uncle is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UncleError {
    /// The uncle hash is already in the candidate's uncle set.
    #[error("uncle not unique: {0}")]
    NotUnique(B256),

    /// The uncle's parent is outside the ancestor window.
    #[error("uncle's parent unknown: {0}")]
    UnknownParent(B256),

    /// The uncle is itself an ancestor of the candidate.
    #[error("uncle already in family: {0}")]
    AlreadyInFamily(B256),
}

/// Errors surfaced by the assembly worker.
#[derive(Debug, Error)]
pub enum MinerError {
    /// The fast-block pool had nothing above the watermark.
    #[error("no fast block to mine")]
    NoFastBlockToMine,

    /// Neither pending fruits nor pending fast blocks exist.
    #[error("nothing to mine: no pending fruits and no pending fast blocks")]
    NothingToMine,

    /// Consensus engine failure during prepare or finalize.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Pool failure reading pending inputs.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Chain failure writing a sealed block.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for miner operations.
pub type MinerResult<T> = Result<T, MinerError>;
