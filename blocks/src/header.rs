// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Address;
use cid::Cid;
use derive_builder::Builder;
use encoding::Cbor;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{ChainEpoch, ElectionProof, Error, Ticket, TipsetKeys};

/// Header of a block. CID is content-derived, computed lazily from the
/// CBOR encoding of every field but the cache itself.
///
/// Usage:
/// ```
/// use blocks::{BlockHeader, TipsetKeys};
/// use address::Address;
///
/// BlockHeader::builder()
///     .miner_address(Address::new_id(1000))
///     .parents(TipsetKeys::default())
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(name = "BlockHeaderBuilder")]
pub struct BlockHeader {
    /// Parents is the set of block CIDs this block was based on. The
    /// simulator only ever produces single-parent tipsets.
    #[builder(default)]
    parents: TipsetKeys,

    /// Aggregate chain weight of the parent tipset.
    #[builder(default)]
    parent_weight: BigInt,

    /// The period in which this block was produced.
    #[builder(default)]
    height: ChainEpoch,

    /// Address of the miner that produced this block. Always the node's
    /// own configured miner address for this simulator.
    miner_address: Address,

    /// The ticket submitted with this block, carrying the VRF proof.
    #[builder(default)]
    ticket: Ticket,

    /// Proof of winning the (trivial, single-miner) leader election.
    #[builder(default)]
    election_proof: ElectionProof,

    /// Seconds since the Unix epoch at which this block was produced.
    #[builder(default)]
    timestamp: u64,

    /// Cached CID, computed on first call to [`BlockHeader::cid`].
    #[builder(setter(skip))]
    #[serde(skip)]
    cached_cid: Option<Cid>,
}

impl Cbor for BlockHeader {}

impl BlockHeader {
    pub fn builder() -> BlockHeaderBuilder {
        BlockHeaderBuilder::default()
    }

    pub fn parents(&self) -> &TipsetKeys {
        &self.parents
    }

    pub fn parent_weight(&self) -> &BigInt {
        &self.parent_weight
    }

    pub fn height(&self) -> ChainEpoch {
        self.height
    }

    pub fn miner_address(&self) -> &Address {
        &self.miner_address
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn election_proof(&self) -> &ElectionProof {
        &self.election_proof
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the content identifier of this header, computing and
    /// caching it on first use.
    pub fn cid(&self) -> Result<Cid, Error> {
        if let Some(cid) = &self.cached_cid {
            return Ok(cid.clone());
        }
        let bytes = self
            .marshal_cbor()
            .map_err(|e| Error::InvalidTipset(e.to_string()))?;
        Ok(encoding::cid_from_cbor(&bytes))
    }

    /// Computes and caches this header's CID, returning `self` for
    /// chaining after construction.
    pub fn with_cached_cid(mut self) -> Self {
        if let Ok(cid) = self.cid() {
            self.cached_cid = Some(cid);
        }
        self
    }

    /// Sort key used to break ties when ordering sibling blocks in a
    /// tipset: smallest VRF proof first.
    pub(crate) fn sort_key(&self) -> Vec<u8> {
        self.ticket.vrfproof.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_is_stable_and_cached() {
        let header = BlockHeader::builder()
            .miner_address(Address::new_id(1000))
            .build()
            .unwrap();
        let a = header.cid().unwrap();
        let b = header.cid().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_headers_have_different_cids() {
        let a = BlockHeader::builder()
            .miner_address(Address::new_id(1000))
            .timestamp(1)
            .build()
            .unwrap();
        let b = BlockHeader::builder()
            .miner_address(Address::new_id(1000))
            .timestamp(2)
            .build()
            .unwrap();
        assert_ne!(a.cid().unwrap(), b.cid().unwrap());
    }
}
