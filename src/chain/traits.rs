//! Snail chain access traits.
//!
//! The worker holds the chain behind a narrow capability interface: it
//! reads the head and chain history, writes sealed blocks, and listens
//! to the head/side/mined-fruit feeds. The chain never calls back into
//! the worker.

use super::events::{ChainFeedEvent, ChainHeadEvent, ChainSideEvent, NewMinedFruitEvent};
use crate::primitives::SnailBlock;
use alloy_primitives::B256;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Error type for chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The block's parent is not known to the chain.
    #[error("unknown parent {parent} for block {number}")]
    UnknownParent {
        /// Missing parent hash.
        parent: B256,
        /// Number of the offending block.
        number: u64,
    },

    /// Block number does not follow its parent.
    #[error("non-contiguous number {number}, parent is at {parent_number}")]
    NonContiguousNumber {
        /// Number of the offending block.
        number: u64,
        /// Number of its parent.
        parent_number: u64,
    },

    /// A fruit was handed to the chain; fruits belong in the fruit pool.
    #[error("refusing to write fruit {0} to the chain")]
    IsFruit(B256),
}

/// Status of a canonical write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The block extended the canonical chain.
    Canonical,
    /// The block was stored as a side block.
    Side,
}

/// Read-only access to snail chain history.
pub trait SnailchainReader: Send + Sync {
    /// The current canonical head block.
    fn current_block(&self) -> Arc<SnailBlock>;

    /// Canonical block at the given height.
    fn block_by_number(&self, number: u64) -> Option<Arc<SnailBlock>>;

    /// Any known block (canonical or side) by hash.
    fn block_by_hash(&self, hash: B256) -> Option<Arc<SnailBlock>>;

    /// Walk up to `count` blocks backwards starting at `hash` (inclusive).
    ///
    /// The walk stops early at the genesis block or at an unknown hash.
    fn blocks_from_hash(&self, hash: B256, count: u64) -> Vec<Arc<SnailBlock>>;
}

/// Structural validation applied before a block is written.
pub trait SnailValidator: Send + Sync {
    /// Check linkage of `block` against the chain.
    fn validate_block(
        &self,
        block: &SnailBlock,
        chain: &dyn SnailchainReader,
    ) -> Result<(), ChainError>;
}

/// Full snail chain access: history reads, canonical writes, event feeds.
pub trait Snailchain: SnailchainReader {
    /// The validator consulted on writes.
    fn validator(&self) -> Arc<dyn SnailValidator>;

    /// Write a sealed block. Returns whether it became canonical.
    fn write_canonical_block(&self, block: SnailBlock) -> Result<WriteStatus, ChainError>;

    /// Replay events through the chain's feeds after a write.
    fn post_chain_events(&self, events: Vec<ChainFeedEvent>);

    /// Subscribe to canonical head changes.
    fn subscribe_chain_head(&self) -> broadcast::Receiver<ChainHeadEvent>;

    /// Subscribe to side-block notifications.
    fn subscribe_chain_side(&self) -> broadcast::Receiver<ChainSideEvent>;

    /// Subscribe to fruits reaching the chain inside full blocks.
    fn subscribe_new_mined_fruit(&self) -> broadcast::Receiver<NewMinedFruitEvent>;
}
