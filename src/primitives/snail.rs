//! Snail chain block primitives.
//!
//! The snail chain is the slow proof-of-work chain of the dual-chain
//! design. Its blocks come in two shapes sharing one type:
//!
//! ```text
//! SnailBlock
//! ├── header: SnailHeader
//! │   ├── parent_hash: B256
//! │   ├── coinbase: Address
//! │   ├── pointer_hash: B256     (freshness anchor into chain history)
//! │   ├── fruits_hash: B256
//! │   ├── fast_hash: B256
//! │   ├── fast_number: u64       (0 = no fast attestation)
//! │   ├── number: u64
//! │   ├── to_elect / publickey   (election participation)
//! │   ├── difficulty: U256
//! │   ├── time / extra / nonce
//! └── body: SnailBody
//!     ├── fruits: Vec<SnailBlock>
//!     └── signs: Vec<PbftSign>
//! ```
//!
//! A **fruit** is a `SnailBlock` with a non-zero `fast_number` and an
//! empty fruit list: it attests to exactly one fast block and waits in
//! the fruit pool until a full block absorbs it. A **full block** packs
//! a continuous run of fruits (and optionally a direct fast attestation)
//! and extends the chain.

use super::fast::PbftSign;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, RlpDecodable, RlpEncodable};

/// Snail block header.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct SnailHeader {
    /// Hash of the parent snail block.
    pub parent_hash: B256,
    /// Beneficiary of the mining reward. Zero while not mining.
    pub coinbase: Address,
    /// Hash of the ancestor block anchoring the freshness rule.
    pub pointer_hash: B256,
    /// Commitment over the embedded fruit list.
    pub fruits_hash: B256,
    /// Hash of the attested fast block. Zero when `fast_number` is zero.
    pub fast_hash: B256,
    /// Number of the attested fast block; zero means no attestation.
    pub fast_number: u64,
    /// Snail block height.
    pub number: u64,
    /// Whether the miner participates in the next election round.
    pub to_elect: bool,
    /// Election public key of the miner.
    pub publickey: Bytes,
    /// Proof-of-work difficulty, populated by the consensus engine.
    pub difficulty: U256,
    /// Unix timestamp.
    pub time: u64,
    /// Arbitrary extra bytes.
    pub extra: Bytes,
    /// Proof-of-work nonce, populated by sealing.
    pub nonce: u64,
}

impl SnailHeader {
    /// Compute the header hash: keccak256 over the RLP encoding.
    pub fn hash(&self) -> B256 {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        keccak256(&buf)
    }
}

/// Snail block body: the absorbed fruits and the PBFT signatures copied
/// from the attested fast block.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct SnailBody {
    /// Embedded fruits, fast-numbers strictly increasing with step one.
    pub fruits: Vec<SnailBlock>,
    /// PBFT signatures over the attested fast block.
    pub signs: Vec<PbftSign>,
}

/// A snail chain block, either a full block or a fruit (see [`SnailBlock::is_fruit`]).
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct SnailBlock {
    /// Block header.
    pub header: SnailHeader,
    /// Block body.
    pub body: SnailBody,
}

impl SnailBlock {
    /// Assemble a block from a header, a fruit list and a signature list.
    ///
    /// The fruit commitment in the header is recomputed from the list.
    pub fn new(mut header: SnailHeader, fruits: Vec<SnailBlock>, signs: Vec<PbftSign>) -> Self {
        header.fruits_hash = calc_fruits_hash(&fruits);
        Self { header, body: SnailBody { fruits, signs } }
    }

    /// Block hash (header hash).
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Snail block height.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Parent block hash.
    pub fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    /// Number of the attested fast block; zero when none.
    pub fn fast_number(&self) -> u64 {
        self.header.fast_number
    }

    /// Hash of the attested fast block.
    pub fn fast_hash(&self) -> B256 {
        self.header.fast_hash
    }

    /// Pointer hash anchoring the freshness rule.
    pub fn pointer_hash(&self) -> B256 {
        self.header.pointer_hash
    }

    /// Unix timestamp.
    pub fn time(&self) -> u64 {
        self.header.time
    }

    /// The embedded fruits.
    pub fn fruits(&self) -> &[SnailBlock] {
        &self.body.fruits
    }

    /// The copied PBFT signatures.
    pub fn signs(&self) -> &[PbftSign] {
        &self.body.signs
    }

    /// Whether this block is a fruit: it attests to a single fast block
    /// and embeds no fruits of its own. Fruits are never written to the
    /// chain; they enter the fruit pool awaiting absorption.
    pub fn is_fruit(&self) -> bool {
        self.header.fast_number != 0 && self.body.fruits.is_empty()
    }
}

/// Commitment over a fruit list: keccak256 of the RLP-encoded fruit hashes.
pub fn calc_fruits_hash(fruits: &[SnailBlock]) -> B256 {
    let hashes: Vec<B256> = fruits.iter().map(|f| f.hash()).collect();
    let mut buf = Vec::new();
    hashes.encode(&mut buf);
    keccak256(&buf)
}
