//! Snail Node
//!
//! Block assembly for a dual-chain proof-of-work design. A fast PBFT
//! stream produces **fast blocks**; proof-of-work miners attest to them
//! with lightweight **fruits** and periodically pack a continuous run
//! of fruits into a full **snail block** that extends the chain.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Snail Node                                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │   fast consensus ──► SnailPool ──┐                                  │
//! │                     (fruits,     │ events + pending views           │
//! │                      fast blocks)│                                  │
//! │                                  ▼                                  │
//! │   Snailchain ───── events ───► Worker ──► Agents (PoW sealing)      │
//! │     ▲                            │              │                   │
//! │     │        canonical write     │◄── results ──┘                   │
//! │     └────────────────────────────┘                                  │
//! │                                                                     │
//! │   Engine: header preparation, candidate finalize, sealing           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: snail blocks, fruits, fast-block references
//! - [`chain`]: chain access traits, event feeds, in-memory chain
//! - [`pool`]: fruit/fast-block pool trait and in-memory pool
//! - [`consensus`]: the pluggable engine interface
//! - [`miner`]: the assembly worker, agents and trackers

#![warn(unused_crate_dependencies)]
// Dependencies used by the demo binary
use eyre as _;
use tracing_subscriber as _;

pub mod chain;
pub mod consensus;
pub mod miner;
pub mod pool;
pub mod primitives;

// Re-export primitive types
pub use primitives::{FastBlock, FastBody, PbftSign, SnailBlock, SnailBody, SnailHeader};

// Re-export chain access types
pub use chain::{
    ChainError, ChainEvent, ChainFeedEvent, ChainHeadEvent, ChainSideEvent, InMemorySnailchain,
    NewMinedBlockEvent, NewMinedFruitEvent, SnailValidator, Snailchain, SnailchainReader,
    WriteStatus,
};

// Re-export pool types
pub use pool::{InMemorySnailPool, NewFastBlocksEvent, NewFruitsEvent, PoolError, SnailPool};

// Re-export consensus engine types
pub use consensus::{DevEngine, Engine, EngineError};

// Re-export miner types
pub use miner::{
    Agent, Backend, ChainConfig, CpuAgent, FruitError, MinedResult, MinerConfig, MinerError,
    MinerResult, UncleError, UnconfirmedBlocks, Work, Worker,
};
