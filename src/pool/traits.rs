//! Snail pool trait and event payloads.
//!
//! The pool buffers fruits awaiting absorption and fast blocks awaiting
//! attestation. The worker never mutates the pool beyond handing back
//! fruits it sealed itself (`add_remote_fruits`); everything else flows
//! through pending reads and the two broadcast streams.

use crate::primitives::{FastBlock, SnailBlock};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the fruit and fast-block subscription channels, sized
/// after the pool's own ingestion queue.
pub const TX_CHAN_SIZE: usize = 4096;

/// Error type for pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool rejected a fruit (not a fruit, or stale).
    #[error("fruit {0} rejected: {1}")]
    InvalidFruit(alloy_primitives::B256, String),

    /// The pool is shutting down.
    #[error("pool closed")]
    Closed,
}

/// New fruits entered the pool.
#[derive(Clone, Debug)]
pub struct NewFruitsEvent {
    /// The fruits, ordered by fast-number.
    pub fruits: Vec<Arc<SnailBlock>>,
}

/// New fast blocks await attestation.
#[derive(Clone, Debug)]
pub struct NewFastBlocksEvent {
    /// The fast blocks, ordered by number.
    pub fast_blocks: Vec<Arc<FastBlock>>,
}

/// Fruit and fast-block pool, as seen by the worker.
pub trait SnailPool: Send + Sync {
    /// Pending fruits, ordered by fast-number.
    fn pending_fruits(&self) -> Result<Vec<Arc<SnailBlock>>, PoolError>;

    /// Pending fast blocks, ordered by number.
    fn pending_fast_blocks(&self) -> Result<Vec<Arc<FastBlock>>, PoolError>;

    /// Hand locally sealed fruits back to the pool for distribution.
    fn add_remote_fruits(&self, fruits: Vec<Arc<SnailBlock>>) -> Result<(), PoolError>;

    /// Subscribe to fruits entering the pool.
    fn subscribe_new_fruits(&self) -> broadcast::Receiver<NewFruitsEvent>;

    /// Subscribe to fast blocks entering the pool.
    fn subscribe_new_fast_blocks(&self) -> broadcast::Receiver<NewFastBlocksEvent>;
}
