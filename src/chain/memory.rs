//! In-memory snail chain.
//!
//! A [`Snailchain`] implementation backed by ordered maps, for tests,
//! the demo binary and development networks. Canonical blocks are keyed
//! by height; every written block (canonical or side) is indexed by
//! hash.

use super::events::{
    ChainEvent, ChainFeedEvent, ChainHeadEvent, ChainSideEvent, NewMinedFruitEvent,
    CHAIN_HEAD_CHAN_SIZE, CHAIN_SIDE_CHAN_SIZE,
};
use super::traits::{ChainError, SnailValidator, Snailchain, SnailchainReader, WriteStatus};
use crate::pool::TX_CHAN_SIZE;
use crate::primitives::SnailBlock;
use alloy_primitives::B256;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::debug;

/// Checks parent linkage before a write.
#[derive(Debug, Default)]
pub struct LinkageValidator;

impl SnailValidator for LinkageValidator {
    fn validate_block(
        &self,
        block: &SnailBlock,
        chain: &dyn SnailchainReader,
    ) -> Result<(), ChainError> {
        let parent = chain.block_by_hash(block.parent_hash()).ok_or(ChainError::UnknownParent {
            parent: block.parent_hash(),
            number: block.number(),
        })?;
        if block.number() != parent.number() + 1 {
            return Err(ChainError::NonContiguousNumber {
                number: block.number(),
                parent_number: parent.number(),
            });
        }
        Ok(())
    }
}

/// In-memory snail chain with broadcast event feeds.
pub struct InMemorySnailchain {
    /// Canonical blocks by height.
    canonical: RwLock<BTreeMap<u64, Arc<SnailBlock>>>,
    /// Every known block by hash, side blocks included.
    by_hash: RwLock<HashMap<B256, Arc<SnailBlock>>>,
    validator: Arc<dyn SnailValidator>,

    head_tx: broadcast::Sender<ChainHeadEvent>,
    side_tx: broadcast::Sender<ChainSideEvent>,
    chain_tx: broadcast::Sender<ChainEvent>,
    mined_fruit_tx: broadcast::Sender<NewMinedFruitEvent>,
}

impl InMemorySnailchain {
    /// Create a chain rooted at `genesis`.
    pub fn new(genesis: SnailBlock) -> Self {
        let genesis = Arc::new(genesis);
        let mut canonical = BTreeMap::new();
        let mut by_hash = HashMap::new();
        canonical.insert(genesis.number(), genesis.clone());
        by_hash.insert(genesis.hash(), genesis);

        let (head_tx, _) = broadcast::channel(CHAIN_HEAD_CHAN_SIZE);
        let (side_tx, _) = broadcast::channel(CHAIN_SIDE_CHAN_SIZE);
        let (chain_tx, _) = broadcast::channel(CHAIN_HEAD_CHAN_SIZE);
        let (mined_fruit_tx, _) = broadcast::channel(TX_CHAN_SIZE);

        Self {
            canonical: RwLock::new(canonical),
            by_hash: RwLock::new(by_hash),
            validator: Arc::new(LinkageValidator),
            head_tx,
            side_tx,
            chain_tx,
            mined_fruit_tx,
        }
    }

    /// Current canonical height.
    pub fn height(&self) -> u64 {
        *self.canonical.read().keys().last().expect("chain holds at least genesis")
    }

    /// Subscribe to the chain feed (every written block).
    pub fn subscribe_chain_event(&self) -> broadcast::Receiver<ChainEvent> {
        self.chain_tx.subscribe()
    }
}

impl SnailchainReader for InMemorySnailchain {
    fn current_block(&self) -> Arc<SnailBlock> {
        self.canonical
            .read()
            .values()
            .last()
            .cloned()
            .expect("chain holds at least genesis")
    }

    fn block_by_number(&self, number: u64) -> Option<Arc<SnailBlock>> {
        self.canonical.read().get(&number).cloned()
    }

    fn block_by_hash(&self, hash: B256) -> Option<Arc<SnailBlock>> {
        self.by_hash.read().get(&hash).cloned()
    }

    fn blocks_from_hash(&self, hash: B256, count: u64) -> Vec<Arc<SnailBlock>> {
        let by_hash = self.by_hash.read();
        let mut blocks = Vec::new();
        let mut cursor = hash;
        for _ in 0..count {
            let Some(block) = by_hash.get(&cursor) else { break };
            cursor = block.parent_hash();
            let at_genesis = block.number() == 0;
            blocks.push(block.clone());
            if at_genesis {
                break;
            }
        }
        blocks
    }
}

impl Snailchain for InMemorySnailchain {
    fn validator(&self) -> Arc<dyn SnailValidator> {
        self.validator.clone()
    }

    fn write_canonical_block(&self, block: SnailBlock) -> Result<WriteStatus, ChainError> {
        if block.is_fruit() {
            return Err(ChainError::IsFruit(block.hash()));
        }
        self.validator.validate_block(&block, self)?;

        let block = Arc::new(block);
        let head = self.current_block();

        self.by_hash.write().insert(block.hash(), block.clone());

        if block.parent_hash() == head.hash() {
            self.canonical.write().insert(block.number(), block.clone());
            for fruit in block.fruits() {
                let _ = self
                    .mined_fruit_tx
                    .send(NewMinedFruitEvent { block: Arc::new(fruit.clone()) });
            }
            debug!(target: "chain", number = block.number(), hash = %block.hash(), "extended canonical chain");
            Ok(WriteStatus::Canonical)
        } else {
            let _ = self.side_tx.send(ChainSideEvent { block: block.clone() });
            debug!(target: "chain", number = block.number(), hash = %block.hash(), "stored side block");
            Ok(WriteStatus::Side)
        }
    }

    fn post_chain_events(&self, events: Vec<ChainFeedEvent>) {
        for event in events {
            match event {
                ChainFeedEvent::Chain(ev) => {
                    let _ = self.chain_tx.send(ev);
                }
                ChainFeedEvent::Head(ev) => {
                    let _ = self.head_tx.send(ev);
                }
            }
        }
    }

    fn subscribe_chain_head(&self) -> broadcast::Receiver<ChainHeadEvent> {
        self.head_tx.subscribe()
    }

    fn subscribe_chain_side(&self) -> broadcast::Receiver<ChainSideEvent> {
        self.side_tx.subscribe()
    }

    fn subscribe_new_mined_fruit(&self) -> broadcast::Receiver<NewMinedFruitEvent> {
        self.mined_fruit_tx.subscribe()
    }
}
