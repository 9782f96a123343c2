//! Consensus engine interface for the snail chain.
//!
//! The worker delegates header preparation (difficulty and related
//! fields) and candidate finalization to a pluggable engine. The
//! proof-of-work search itself runs inside mining agents, which call
//! [`Engine::seal`].
//!
//! # Components
//!
//! - [`Engine`]: prepare/finalize/seal entry points
//! - [`DevEngine`]: fixed-difficulty engine for tests and dev networks

mod dev;

pub use dev::{DevEngine, DEV_DIFFICULTY};

use crate::chain::SnailchainReader;
use crate::primitives::{PbftSign, SnailBlock, SnailHeader};

/// Error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The header's ancestry is not known to the chain.
    #[error("unknown ancestor for block {number}")]
    UnknownAncestor {
        /// Number of the offending header.
        number: u64,
    },

    /// The candidate failed a structural check during finalize.
    #[error("invalid candidate: {0}")]
    InvalidCandidate(String),

    /// Sealing was interrupted before a solution was found.
    #[error("sealing interrupted")]
    SealInterrupted,
}

/// Consensus engine entry points used by the assembly worker and its
/// agents.
pub trait Engine: Send + Sync {
    /// Populate difficulty and engine-owned header fields for a draft.
    fn prepare(
        &self,
        chain: &dyn SnailchainReader,
        header: &mut SnailHeader,
    ) -> Result<(), EngineError>;

    /// Assemble the final sealable candidate from its parts. Admitted
    /// uncles participate in reward accounting only; they are not
    /// embedded in the body.
    fn finalize(
        &self,
        chain: &dyn SnailchainReader,
        header: SnailHeader,
        uncles: &[SnailHeader],
        fruits: Vec<SnailBlock>,
        signs: Vec<PbftSign>,
    ) -> Result<SnailBlock, EngineError>;

    /// Run the proof-of-work search over a finalized candidate and
    /// return the sealed block.
    fn seal(&self, block: &SnailBlock) -> Result<SnailBlock, EngineError>;
}
