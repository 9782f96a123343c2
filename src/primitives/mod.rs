//! Primitive types of the dual-chain design.
//!
//! # Modules
//!
//! - [`snail`]: Snail chain blocks (full blocks and fruits)
//! - [`fast`]: Fast chain references (fast blocks, PBFT signatures)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Dual-chain artifacts                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  fast chain (PBFT)      fruit            snail chain (PoW)  │
//! │  ────────────────       ─────            ────────────────   │
//! │  FastBlock #N     ──►   SnailBlock       SnailBlock #M      │
//! │    number/hash          fast_number=N      fruits[..]       │
//! │    signs[..]            fruits=[]     ──►  signs[..]        │
//! │                                            fast_number opt  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod fast;
pub mod snail;

// Re-export fast chain references
pub use fast::{FastBlock, FastBody, PbftSign};

// Re-export snail chain types
pub use snail::{calc_fruits_hash, SnailBlock, SnailBody, SnailHeader};
