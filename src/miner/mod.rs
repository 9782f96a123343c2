//! Snail block assembly and mining.
//!
//! The worker keeps a candidate block under continuous assembly: it
//! follows the fruit pool, the fast-block pool and the chain feeds,
//! selects admissible fruits and a fast block into a fresh candidate,
//! and hands the finalized candidate to every registered sealing agent.
//! Sealed artifacts come back on a shared channel and are either fed to
//! the fruit pool (fruits) or written to the chain and announced
//! (blocks).
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Worker                                 │
//! │                                                               │
//! │  fruit pool ──┐                                               │
//! │  fast pool  ──┤  update loop        commit_new_work           │
//! │  chain head ──┼─ (select over  ──►  draft header              │
//! │  chain side ──┤   broadcasts)       select fast block, fruits │
//! │  mined fruit──┘                     admit uncles, finalize    │
//! │                                        │                      │
//! │                                        ▼ push                 │
//! │                  ┌──────────┐   ┌──────────┐                  │
//! │                  │ Agent #1 │   │ Agent #2 │  ...             │
//! │                  └────┬─────┘   └────┬─────┘                  │
//! │                       └──── results ─┘                        │
//! │                               │                               │
//! │            result loop: fruit ─► pool.add_remote_fruits       │
//! │                         block ─► chain.write + announce       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: miner and fork-schedule configuration
//! - [`error`]: fruit/uncle/worker error types
//! - [`work`]: the per-cycle assembly context and fruit selection
//! - [`agent`]: the sealing-agent contract and the CPU agent
//! - [`worker`]: the event-driven worker itself
//! - [`unconfirmed`]: confirmation tracking for operator logs

mod agent;
mod config;
mod error;
mod unconfirmed;
mod work;
mod worker;

pub use agent::{Agent, CpuAgent, MinedResult};
pub use config::{ChainConfig, MinerConfig, DAO_FORK_BLOCK_EXTRA, DAO_FORK_EXTRA_RANGE};
pub use error::{FruitError, MinerError, MinerResult, UncleError};
pub use unconfirmed::UnconfirmedBlocks;
pub use work::Work;
pub use worker::Worker;

use crate::chain::Snailchain;
use crate::pool::SnailPool;
use std::sync::Arc;

/// Capacity of the shared sealed-result channel.
pub const RESULT_QUEUE_SIZE: usize = 10;

/// Confirmation depth for the unconfirmed-block tracker.
pub const MINING_LOG_AT_DEPTH: u64 = 5;

/// Maximum age, in snail blocks, of a fruit's pointer relative to the
/// candidate embedding it.
pub const FRUIT_FRESHNESS: u64 = 17;

/// Distance below the parent at which the candidate's pointer hash is
/// anchored.
pub const POINTER_HASH_FRESH: u64 = 7;

/// Maximum uncles admitted into one candidate.
pub const MAX_UNCLES: usize = 2;

/// How many ancestors seed the uncle ancestry and family sets.
pub const ANCESTOR_WINDOW: u64 = 7;

/// The node facilities the worker mines against.
pub trait Backend: Send + Sync {
    /// The snail chain.
    fn snail_chain(&self) -> Arc<dyn Snailchain>;

    /// The fruit and fast-block pool.
    fn snail_pool(&self) -> Arc<dyn SnailPool>;
}
