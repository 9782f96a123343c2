//! Snail chain event payloads.
//!
//! Each event stream is an independent broadcast subscription with a
//! typed payload. Blocks travel as `Arc<SnailBlock>` so a burst of
//! subscribers never clones block bodies.

use crate::primitives::SnailBlock;
use alloy_primitives::B256;
use std::sync::Arc;

/// Capacity of the chain-head subscription channel.
pub const CHAIN_HEAD_CHAN_SIZE: usize = 10;

/// Capacity of the chain-side subscription channel.
pub const CHAIN_SIDE_CHAN_SIZE: usize = 10;

/// The canonical head advanced.
#[derive(Clone, Debug)]
pub struct ChainHeadEvent {
    /// The new head block.
    pub block: Arc<SnailBlock>,
}

/// A block was written outside the canonical chain (potential uncle).
#[derive(Clone, Debug)]
pub struct ChainSideEvent {
    /// The side block.
    pub block: Arc<SnailBlock>,
}

/// A fruit reached the chain inside a full block.
#[derive(Clone, Debug)]
pub struct NewMinedFruitEvent {
    /// The absorbed fruit.
    pub block: Arc<SnailBlock>,
}

/// A block was written to the chain (canonical or side).
#[derive(Clone, Debug)]
pub struct ChainEvent {
    /// The written block.
    pub block: Arc<SnailBlock>,
    /// Its hash.
    pub hash: B256,
}

/// A block was sealed locally and written canonically.
#[derive(Clone, Debug)]
pub struct NewMinedBlockEvent {
    /// The sealed block.
    pub block: Arc<SnailBlock>,
}

/// Events replayed through the chain's feeds after a canonical write.
#[derive(Clone, Debug)]
pub enum ChainFeedEvent {
    /// Replay on the chain feed.
    Chain(ChainEvent),
    /// Replay on the chain-head feed.
    Head(ChainHeadEvent),
}
