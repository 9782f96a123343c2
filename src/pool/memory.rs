//! In-memory snail pool.
//!
//! Fruits are keyed by the fast-number they attest to, so the pending
//! view is ordered and a re-mined fruit replaces its predecessor. Fast
//! blocks are keyed by number.

use super::traits::{NewFastBlocksEvent, NewFruitsEvent, PoolError, SnailPool, TX_CHAN_SIZE};
use crate::primitives::{FastBlock, SnailBlock};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::broadcast;
use tracing::debug;

/// In-memory fruit and fast-block pool with broadcast notification.
pub struct InMemorySnailPool {
    fruits: RwLock<BTreeMap<u64, Arc<SnailBlock>>>,
    fast_blocks: RwLock<BTreeMap<u64, Arc<FastBlock>>>,
    fruit_tx: broadcast::Sender<NewFruitsEvent>,
    fast_tx: broadcast::Sender<NewFastBlocksEvent>,
}

impl Default for InMemorySnailPool {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySnailPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        let (fruit_tx, _) = broadcast::channel(TX_CHAN_SIZE);
        let (fast_tx, _) = broadcast::channel(TX_CHAN_SIZE);
        Self {
            fruits: RwLock::new(BTreeMap::new()),
            fast_blocks: RwLock::new(BTreeMap::new()),
            fruit_tx,
            fast_tx,
        }
    }

    /// Feed fast blocks from the fast consensus stream.
    pub fn add_fast_blocks(&self, blocks: Vec<Arc<FastBlock>>) {
        if blocks.is_empty() {
            return;
        }
        {
            let mut pending = self.fast_blocks.write();
            for block in &blocks {
                pending.insert(block.number, block.clone());
            }
        }
        let _ = self.fast_tx.send(NewFastBlocksEvent { fast_blocks: blocks });
    }

    /// Drop fruits attesting to fast blocks at or below `fast_number`,
    /// and the fast blocks themselves. Called when absorbed by a block.
    pub fn remove_below(&self, fast_number: u64) {
        self.fruits.write().retain(|&n, _| n > fast_number);
        self.fast_blocks.write().retain(|&n, _| n > fast_number);
    }

    /// Number of pending fruits.
    pub fn fruit_count(&self) -> usize {
        self.fruits.read().len()
    }
}

impl SnailPool for InMemorySnailPool {
    fn pending_fruits(&self) -> Result<Vec<Arc<SnailBlock>>, PoolError> {
        Ok(self.fruits.read().values().cloned().collect())
    }

    fn pending_fast_blocks(&self) -> Result<Vec<Arc<FastBlock>>, PoolError> {
        Ok(self.fast_blocks.read().values().cloned().collect())
    }

    fn add_remote_fruits(&self, fruits: Vec<Arc<SnailBlock>>) -> Result<(), PoolError> {
        let mut accepted = Vec::with_capacity(fruits.len());
        {
            let mut pending = self.fruits.write();
            for fruit in fruits {
                if !fruit.is_fruit() {
                    return Err(PoolError::InvalidFruit(
                        fruit.hash(),
                        "no fast attestation".into(),
                    ));
                }
                debug!(target: "pool", fast_number = fruit.fast_number(), "fruit entered pool");
                pending.insert(fruit.fast_number(), fruit.clone());
                accepted.push(fruit);
            }
        }
        if !accepted.is_empty() {
            let _ = self.fruit_tx.send(NewFruitsEvent { fruits: accepted });
        }
        Ok(())
    }

    fn subscribe_new_fruits(&self) -> broadcast::Receiver<NewFruitsEvent> {
        self.fruit_tx.subscribe()
    }

    fn subscribe_new_fast_blocks(&self) -> broadcast::Receiver<NewFastBlocksEvent> {
        self.fast_tx.subscribe()
    }
}
