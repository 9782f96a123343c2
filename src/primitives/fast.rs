//! Fast chain primitives, as seen from the snail side.
//!
//! Fast blocks are produced by the separate PBFT consensus stream. The
//! snail worker never validates them; it selects by number and hash and
//! copies the accompanying signatures by value into its candidate.

use alloy_primitives::{Bytes, B256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

/// An opaque PBFT signature over a fast block.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct PbftSign {
    /// Height of the signed fast block.
    pub fast_number: u64,
    /// Hash of the signed fast block.
    pub fast_hash: B256,
    /// The signature bytes.
    pub sign: Bytes,
}

/// Fast block body: the PBFT committee signatures.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct FastBody {
    /// Committee signatures over this fast block.
    pub signs: Vec<PbftSign>,
}

/// A fast block reference. Only number, hash and the signature list are
/// meaningful to the snail subsystem.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize, serde::Deserialize,
)]
pub struct FastBlock {
    /// Fast chain height.
    pub number: u64,
    /// Fast block hash.
    pub hash: B256,
    /// Block body.
    pub body: FastBody,
}

impl FastBlock {
    /// Create a fast block reference.
    pub const fn new(number: u64, hash: B256, body: FastBody) -> Self {
        Self { number, hash, body }
    }

    /// The committee signatures.
    pub fn signs(&self) -> &[PbftSign] {
        &self.body.signs
    }
}
