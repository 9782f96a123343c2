//! Snail chain access layer.
//!
//! # Modules
//!
//! - [`traits`]: chain access traits ([`Snailchain`], [`SnailchainReader`],
//!   [`SnailValidator`]) and the write status/error types
//! - [`events`]: typed event payloads for the chain's broadcast feeds
//! - [`memory`]: in-memory chain for tests, demos and dev networks

pub mod events;
pub mod memory;
pub mod traits;

pub use events::{
    ChainEvent, ChainFeedEvent, ChainHeadEvent, ChainSideEvent, NewMinedBlockEvent,
    NewMinedFruitEvent, CHAIN_HEAD_CHAN_SIZE, CHAIN_SIDE_CHAN_SIZE,
};
pub use memory::{InMemorySnailchain, LinkageValidator};
pub use traits::{ChainError, SnailValidator, Snailchain, SnailchainReader, WriteStatus};
