//! Per-cycle assembly context and fruit selection.

use super::error::{FruitError, UncleError};
use super::FRUIT_FRESHNESS;
use crate::chain::SnailchainReader;
use crate::primitives::{PbftSign, SnailBlock, SnailHeader};
use alloy_primitives::B256;
use std::{collections::HashSet, sync::Arc, time::Instant};
use tracing::debug;

/// The worker's current assembly environment. One `Work` exists per
/// build cycle; it is mutated only under the worker's current lock and
/// replaced wholesale by the next cycle.
#[derive(Debug, Clone)]
pub struct Work {
    /// The candidate header under assembly.
    pub header: SnailHeader,
    /// Hashes of the last ancestors, for uncle parent validity.
    pub ancestors: HashSet<B256>,
    /// Hashes of the candidate's family, for uncle invalidity.
    pub family: HashSet<B256>,
    /// Hashes of admitted uncles.
    pub uncles: HashSet<B256>,
    /// Fruits selected into the candidate, continuity-ordered.
    pub fruits: Vec<SnailBlock>,
    /// PBFT signatures copied from the selected fast block.
    pub signs: Vec<PbftSign>,
    /// The draft (later finalized) candidate block.
    pub block: Option<SnailBlock>,
    /// When this cycle started.
    pub created_at: Instant,
}

impl Work {
    /// Create an empty assembly context around a drafted header.
    pub fn new(header: SnailHeader) -> Self {
        Self {
            header,
            ancestors: HashSet::new(),
            family: HashSet::new(),
            uncles: HashSet::new(),
            fruits: Vec::new(),
            signs: Vec::new(),
            block: None,
            created_at: Instant::now(),
        }
    }

    /// Select the continuous run of pending fruits bridging the parent
    /// block's last embedded fast-number, then admit each through the
    /// pointer and freshness checks.
    ///
    /// The pending list arrives ordered by fast-number. Selection ends
    /// at the first gap, duplicate or backward step after the run has
    /// started.
    pub fn commit_fruits(&mut self, pending: &[Arc<SnailBlock>], chain: &dyn SnailchainReader) {
        let parent = chain.current_block();
        let last_fast_number = parent.fruits().last().map(|f| f.fast_number()).unwrap_or(0);

        let mut run: Vec<&Arc<SnailBlock>> = Vec::new();
        let mut started = false;
        for fruit in pending {
            if last_fast_number == 0 {
                started = true;
            }
            // The seam: a fruit re-attesting the parent's last number or
            // extending it by one starts (or continues) the run.
            if last_fast_number == fruit.fast_number()
                || last_fast_number + 1 == fruit.fast_number()
            {
                started = true;
                run.push(fruit);
                continue;
            }
            if started && last_fast_number < fruit.fast_number() {
                match run.last() {
                    None => run.push(fruit),
                    Some(prev) if prev.fast_number() + 1 == fruit.fast_number() => run.push(fruit),
                    Some(_) => break,
                }
            }
        }

        for fruit in run {
            match self.commit_fruit(fruit, chain, last_fast_number) {
                Ok(()) => self.fruits.push((**fruit).clone()),
                Err(err) => {
                    debug!(target: "miner", fast_number = fruit.fast_number(), %err, "skipping fruit")
                }
            }
        }
    }

    /// Admit a single fruit: fast-number strictly above the parent's
    /// last, pointer resolvable, pointer within the freshness window.
    fn commit_fruit(
        &self,
        fruit: &SnailBlock,
        chain: &dyn SnailchainReader,
        last_fast_number: u64,
    ) -> Result<(), FruitError> {
        if fruit.fast_number() <= last_fast_number {
            return Err(FruitError::InvalidFruitNumber {
                fast_number: fruit.fast_number(),
                last: last_fast_number,
            });
        }
        let pointer = chain
            .block_by_hash(fruit.pointer_hash())
            .ok_or(FruitError::InvalidPointer(fruit.pointer_hash()))?;
        if self.header.number.saturating_sub(pointer.number()) > FRUIT_FRESHNESS {
            return Err(FruitError::FreshnessExceeded {
                number: self.header.number,
                pointer_number: pointer.number(),
            });
        }
        Ok(())
    }

    /// Admit a proposed uncle header under the uniqueness, ancestry and
    /// family rules. The caller enforces the [`super::MAX_UNCLES`] cap.
    pub fn commit_uncle(&mut self, uncle: &SnailHeader) -> Result<(), UncleError> {
        let hash = uncle.hash();
        if self.uncles.contains(&hash) {
            return Err(UncleError::NotUnique(hash));
        }
        if !self.ancestors.contains(&uncle.parent_hash) {
            return Err(UncleError::UnknownParent(uncle.parent_hash));
        }
        if self.family.contains(&hash) {
            return Err(UncleError::AlreadyInFamily(hash));
        }
        self.uncles.insert(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InMemorySnailchain, Snailchain};
    use alloy_primitives::Bytes;

    fn genesis() -> SnailBlock {
        SnailBlock::new(SnailHeader::default(), Vec::new(), Vec::new())
    }

    fn fruit(fast_number: u64, pointer_hash: B256) -> SnailBlock {
        SnailBlock::new(
            SnailHeader { fast_number, pointer_hash, ..Default::default() },
            Vec::new(),
            Vec::new(),
        )
    }

    /// Chain whose head embeds fruits with the given fast-numbers.
    fn chain_with_embedded(fast_numbers: &[u64]) -> InMemorySnailchain {
        let chain = InMemorySnailchain::new(genesis());
        let head = chain.current_block();
        let fruits =
            fast_numbers.iter().map(|&n| fruit(n, head.hash())).collect::<Vec<_>>();
        let block = SnailBlock::new(
            SnailHeader { parent_hash: head.hash(), number: 1, time: 1, ..Default::default() },
            fruits,
            Vec::new(),
        );
        chain.write_canonical_block(block).unwrap();
        chain
    }

    fn work_at(number: u64) -> Work {
        Work::new(SnailHeader { number, ..Default::default() })
    }

    fn pending(chain: &InMemorySnailchain, fast_numbers: &[u64]) -> Vec<Arc<SnailBlock>> {
        let anchor = chain.block_by_number(0).unwrap().hash();
        fast_numbers.iter().map(|&n| Arc::new(fruit(n, anchor))).collect()
    }

    fn selected(work: &Work) -> Vec<u64> {
        work.fruits.iter().map(|f| f.fast_number()).collect()
    }

    #[test]
    fn test_fresh_start_accepts_from_first() {
        let chain = InMemorySnailchain::new(genesis());
        let mut work = work_at(1);
        work.commit_fruits(&pending(&chain, &[10, 11, 12]), &chain);
        assert_eq!(selected(&work), vec![10, 11, 12]);
    }

    #[test]
    fn test_continuity_gap_truncates_run() {
        let chain = chain_with_embedded(&[38, 39, 40]);
        let mut work = work_at(2);
        work.commit_fruits(&pending(&chain, &[41, 42, 44, 45]), &chain);
        assert_eq!(selected(&work), vec![41, 42]);
    }

    #[test]
    fn test_seam_requires_bridge() {
        // Parent's last is 40 and pending starts past the seam: nothing
        // bridges, nothing is selected.
        let chain = chain_with_embedded(&[40]);
        let mut work = work_at(2);
        work.commit_fruits(&pending(&chain, &[43, 44]), &chain);
        assert_eq!(selected(&work), Vec::<u64>::new());
    }

    #[test]
    fn test_seam_duplicate_dropped_by_monotonicity() {
        // A fruit re-attesting the parent's last number rides the seam
        // through phase one but is dropped by the baseline check.
        let chain = chain_with_embedded(&[40]);
        let mut work = work_at(2);
        work.commit_fruits(&pending(&chain, &[40, 41, 42]), &chain);
        assert_eq!(selected(&work), vec![41, 42]);
    }

    #[test]
    fn test_unresolvable_pointer_skipped() {
        let chain = InMemorySnailchain::new(genesis());
        let mut work = work_at(1);
        let mut fruits = pending(&chain, &[10, 11]);
        fruits.push(Arc::new(fruit(12, B256::repeat_byte(0xde))));
        work.commit_fruits(&fruits, &chain);
        assert_eq!(selected(&work), vec![10, 11]);
    }

    #[test]
    fn test_freshness_window() {
        let chain = InMemorySnailchain::new(genesis());
        let anchor = chain.current_block().hash();

        // 120 - 0 = 120 > 17: stale.
        let stale = work_at(120).commit_fruit(&fruit(10, anchor), &chain, 0);
        assert!(matches!(stale, Err(FruitError::FreshnessExceeded { .. })));

        // 17 is the inclusive boundary.
        let fresh = work_at(17).commit_fruit(&fruit(10, anchor), &chain, 0);
        assert_eq!(fresh, Ok(()));
    }

    #[test]
    fn test_uncle_rules() {
        let mut work = work_at(2);
        let parent = B256::repeat_byte(0x01);
        work.ancestors.insert(parent);
        work.family.insert(B256::repeat_byte(0x02));

        let uncle = SnailHeader { parent_hash: parent, number: 1, ..Default::default() };
        work.commit_uncle(&uncle).unwrap();

        // Same uncle again: not unique.
        assert!(matches!(work.commit_uncle(&uncle), Err(UncleError::NotUnique(_))));

        // Parent outside the ancestor window.
        let stranger = SnailHeader {
            parent_hash: B256::repeat_byte(0x99),
            number: 1,
            ..Default::default()
        };
        assert!(matches!(work.commit_uncle(&stranger), Err(UncleError::UnknownParent(_))));

        // A family member is never its own uncle.
        let mut sibling = SnailHeader {
            parent_hash: parent,
            number: 1,
            extra: Bytes::from_static(b"sib"),
            ..Default::default()
        };
        work.family.insert(sibling.hash());
        assert!(matches!(work.commit_uncle(&sibling), Err(UncleError::AlreadyInFamily(_))));

        // A distinct valid sibling is fine.
        sibling.extra = Bytes::from_static(b"ok");
        work.commit_uncle(&sibling).unwrap();
        assert_eq!(work.uncles.len(), 2);
    }
}
