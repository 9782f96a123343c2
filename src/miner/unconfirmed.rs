//! Tracking of locally sealed blocks awaiting canonical confirmation.

use crate::chain::SnailchainReader;
use alloy_primitives::B256;
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use tracing::{info, warn};

/// A locally sealed block awaiting depth-based confirmation.
#[derive(Debug, Clone)]
struct UnconfirmedBlock {
    index: u64,
    hash: B256,
}

/// Ordered set of locally sealed blocks, pruned once the chain grows
/// past the confirmation depth. Purely for operator-visible logs.
pub struct UnconfirmedBlocks {
    chain: Arc<dyn SnailchainReader>,
    depth: u64,
    blocks: Mutex<VecDeque<UnconfirmedBlock>>,
}

impl UnconfirmedBlocks {
    /// Track confirmations against `chain` at the given depth.
    pub fn new(chain: Arc<dyn SnailchainReader>, depth: u64) -> Self {
        Self { chain, depth, blocks: Mutex::new(VecDeque::new()) }
    }

    /// Record a freshly sealed block.
    pub fn insert(&self, index: u64, hash: B256) {
        self.shift(index);
        self.blocks.lock().push_back(UnconfirmedBlock { index, hash });
        info!(target: "miner", number = index, %hash, "🔨 mined potential block");
    }

    /// Drop entries deeper than the confirmation depth below `height`,
    /// reporting the canonical status of each.
    pub fn shift(&self, height: u64) {
        let mut blocks = self.blocks.lock();
        while let Some(next) = blocks.front() {
            if next.index + self.depth > height {
                break;
            }
            match self.chain.block_by_number(next.index) {
                None => {
                    warn!(target: "miner", number = next.index, hash = %next.hash, "block found but no relative chain entry")
                }
                Some(block) if block.hash() == next.hash => {
                    info!(target: "miner", number = next.index, hash = %next.hash, "🔗 block reached canonical chain")
                }
                Some(_) => {
                    info!(target: "miner", number = next.index, hash = %next.hash, "⑂ block became a side fork")
                }
            }
            blocks.pop_front();
        }
    }

    /// Number of blocks still awaiting confirmation.
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Whether nothing is awaiting confirmation.
    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}
