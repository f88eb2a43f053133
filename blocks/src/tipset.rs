// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::{BlockHeader, ChainEpoch, Error};

/// A set of CIDs forming a unique key for a [`Tipset`]. Cloning is cheap;
/// equal keys have equivalent iteration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKeys {
    pub cids: Vec<Cid>,
}

impl TipsetKeys {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self { cids }
    }

    pub fn cids(&self) -> &[Cid] {
        &self.cids
    }
}

/// An immutable, non-empty set of blocks at the same height sharing the
/// same parent set. Blocks are canonically ordered by ticket.
#[derive(Clone, Debug)]
pub struct Tipset {
    headers: Vec<BlockHeader>,
    key: OnceCell<TipsetKeys>,
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.headers.eq(&other.headers)
    }
}

impl Tipset {
    /// Builds a new Tipset from a collection of blocks. All headers must
    /// share identical parents and height.
    pub fn new(mut headers: Vec<BlockHeader>) -> Result<Self, Error> {
        verify_blocks(&headers)?;
        headers.sort_by_cached_key(BlockHeader::sort_key);
        Ok(Self {
            headers,
            key: OnceCell::new(),
        })
    }

    /// Returns the height of the tipset.
    pub fn epoch(&self) -> ChainEpoch {
        self.min_ticket_block().height()
    }

    /// Returns all blocks in the tipset.
    pub fn blocks(&self) -> &[BlockHeader] {
        &self.headers
    }

    /// Consumes the tipset, returning its blocks.
    pub fn into_blocks(self) -> Vec<BlockHeader> {
        self.headers
    }

    /// Returns the block with the smallest ticket in the tipset. By
    /// convention, successful messages in a mined batch are all attributed
    /// to this block.
    pub fn min_ticket_block(&self) -> &BlockHeader {
        self.headers.first().expect("Tipset::new guarantees non-empty")
    }

    /// Returns the number of blocks in the tipset.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns a key for the tipset, computing and caching it on first use.
    pub fn key(&self) -> &TipsetKeys {
        self.key.get_or_init(|| {
            TipsetKeys::new(
                self.headers
                    .iter()
                    .map(|h| h.cid().expect("header CID is always computable"))
                    .collect(),
            )
        })
    }

    /// Returns the CIDs of the blocks in this tipset.
    pub fn cids(&self) -> &[Cid] {
        self.key().cids()
    }

    /// Returns the parent keys shared by every block in the tipset.
    pub fn parents(&self) -> &TipsetKeys {
        self.min_ticket_block().parents()
    }

    /// Returns the tipset's aggregate chain weight.
    pub fn weight(&self) -> &num_bigint::BigInt {
        self.min_ticket_block().parent_weight()
    }
}

fn verify_blocks(headers: &[BlockHeader]) -> Result<(), Error> {
    let first_header = headers.first().ok_or(Error::NoBlocks)?;

    let verify = |predicate: bool, message: &'static str| {
        if predicate {
            Ok(())
        } else {
            Err(Error::InvalidTipset(message.to_string()))
        }
    };

    for header in &headers[1..] {
        verify(header.parents() == first_header.parents(), "parent cids are not equal")?;
        verify(header.height() == first_header.height(), "heights are not equal")?;
    }

    info!("verified tipset of {} block(s) at height {}", headers.len(), first_header.height());
    Ok(())
}
