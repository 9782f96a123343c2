//! Fixed-difficulty engine for tests and dev networks.

use super::{Engine, EngineError};
use crate::chain::SnailchainReader;
use crate::primitives::{PbftSign, SnailBlock, SnailHeader};
use alloy_primitives::U256;

/// Difficulty assigned to every header by [`DevEngine`].
pub const DEV_DIFFICULTY: u64 = 0x2000;

/// A consensus engine that skips the proof-of-work search: headers get
/// a fixed difficulty and sealing derives the nonce from the candidate
/// hash. Verification-grade engines plug in behind the same trait.
#[derive(Debug, Default)]
pub struct DevEngine;

impl DevEngine {
    /// Create a dev engine.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for DevEngine {
    fn prepare(
        &self,
        chain: &dyn SnailchainReader,
        header: &mut SnailHeader,
    ) -> Result<(), EngineError> {
        if chain.block_by_hash(header.parent_hash).is_none() {
            return Err(EngineError::UnknownAncestor { number: header.number });
        }
        header.difficulty = U256::from(DEV_DIFFICULTY);
        Ok(())
    }

    fn finalize(
        &self,
        _chain: &dyn SnailchainReader,
        header: SnailHeader,
        _uncles: &[SnailHeader],
        fruits: Vec<SnailBlock>,
        signs: Vec<PbftSign>,
    ) -> Result<SnailBlock, EngineError> {
        if header.fast_number == 0 && fruits.is_empty() {
            return Err(EngineError::InvalidCandidate(
                "no fast attestation and no fruits".into(),
            ));
        }
        Ok(SnailBlock::new(header, fruits, signs))
    }

    fn seal(&self, block: &SnailBlock) -> Result<SnailBlock, EngineError> {
        let mut sealed = block.clone();
        let hash = block.hash();
        sealed.header.nonce = u64::from_be_bytes(
            hash.as_slice()[..8].try_into().map_err(|_| EngineError::SealInterrupted)?,
        );
        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemorySnailchain;

    fn genesis() -> SnailBlock {
        SnailBlock::new(SnailHeader::default(), Vec::new(), Vec::new())
    }

    #[test]
    fn test_prepare_sets_difficulty() {
        let chain = InMemorySnailchain::new(genesis());
        let engine = DevEngine::new();

        let mut header = SnailHeader {
            parent_hash: chain.current_block().hash(),
            number: 1,
            ..Default::default()
        };
        engine.prepare(&chain, &mut header).unwrap();
        assert_eq!(header.difficulty, U256::from(DEV_DIFFICULTY));
    }

    #[test]
    fn test_prepare_unknown_ancestor() {
        let chain = InMemorySnailchain::new(genesis());
        let engine = DevEngine::new();

        let mut header = SnailHeader {
            parent_hash: alloy_primitives::B256::repeat_byte(0x77),
            number: 9,
            ..Default::default()
        };
        assert_eq!(
            engine.prepare(&chain, &mut header),
            Err(EngineError::UnknownAncestor { number: 9 })
        );
    }

    #[test]
    fn test_finalize_rejects_empty_candidate() {
        let chain = InMemorySnailchain::new(genesis());
        let engine = DevEngine::new();

        let header = SnailHeader { number: 1, ..Default::default() };
        assert!(matches!(
            engine.finalize(&chain, header, &[], Vec::new(), Vec::new()),
            Err(EngineError::InvalidCandidate(_))
        ));
    }

    #[test]
    fn test_seal_populates_nonce() {
        let engine = DevEngine::new();

        let candidate = SnailBlock::new(
            SnailHeader { number: 1, fast_number: 5, ..Default::default() },
            Vec::new(),
            Vec::new(),
        );
        let sealed = engine.seal(&candidate).unwrap();
        assert_ne!(sealed.header.nonce, 0);
    }
}
