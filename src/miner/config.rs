//! Miner configuration.

use crate::primitives::SnailHeader;
use alloy_primitives::{Address, Bytes};

/// Number of blocks past the DAO fork point that carry the override.
pub const DAO_FORK_EXTRA_RANGE: u64 = 10;

/// Reserved extra bytes signalling fork support.
pub const DAO_FORK_BLOCK_EXTRA: &[u8] = b"dao-hard-fork";

/// Fork schedule parameters consulted while drafting headers.
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    /// Height of the DAO hard fork; `None` disables the extra override.
    pub dao_fork_block: Option<u64>,
    /// Whether this miner supports the fork.
    pub dao_fork_support: bool,
}

impl ChainConfig {
    /// Force or strip the reserved extra bytes when the header falls in
    /// the fork's override range.
    pub fn apply_dao_extra(&self, header: &mut SnailHeader) {
        let Some(dao_block) = self.dao_fork_block else { return };
        let limit = dao_block + DAO_FORK_EXTRA_RANGE;
        if header.number >= dao_block && header.number < limit {
            if self.dao_fork_support {
                header.extra = Bytes::from_static(DAO_FORK_BLOCK_EXTRA);
            } else if header.extra.as_ref() == DAO_FORK_BLOCK_EXTRA {
                header.extra = Bytes::new();
            }
        }
    }
}

/// Miner configuration.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Beneficiary of mining rewards.
    pub coinbase: Address,

    /// Extra bytes stamped into drafted headers.
    pub extra_data: Bytes,

    /// Mine pure fruits only; pending fruits are left for other miners.
    pub fruit_only: bool,

    /// Participate in the next election round.
    pub to_elect: bool,

    /// Election public key advertised in headers.
    pub publickey: Bytes,

    /// Fork schedule.
    pub chain: ChainConfig,
}

impl MinerConfig {
    /// Create a new miner configuration.
    pub fn new(coinbase: Address) -> Self {
        Self {
            coinbase,
            extra_data: Bytes::default(),
            fruit_only: false,
            to_elect: false,
            publickey: Bytes::default(),
            chain: ChainConfig::default(),
        }
    }

    /// Set extra data.
    pub fn with_extra_data(mut self, extra_data: Bytes) -> Self {
        self.extra_data = extra_data;
        self
    }

    /// Enable fruit-only mining.
    pub fn with_fruit_only(mut self, fruit_only: bool) -> Self {
        self.fruit_only = fruit_only;
        self
    }

    /// Set election participation.
    pub fn with_election(mut self, to_elect: bool, publickey: Bytes) -> Self {
        self.to_elect = to_elect;
        self.publickey = publickey;
        self
    }

    /// Set the fork schedule.
    pub fn with_chain_config(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }
}
