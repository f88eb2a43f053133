// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use blocks::BlockHeader;
use cid::Cid;
use db::Store;
use encoding::Cbor;

use crate::Error;

fn block_key(cid: &Cid) -> String {
    format!("blocks/{cid}")
}

/// Write-through store for block headers, keyed by their own CID
/// (`blocks/<cid>`).
pub struct BlockManager<BS> {
    store: BS,
}

impl<BS: Store> BlockManager<BS> {
    pub fn new(store: BS) -> Self {
        Self { store }
    }

    pub fn put(&self, header: &BlockHeader) -> Result<Cid, Error> {
        let cid = header.cid()?;
        self.store.write(block_key(&cid), header.marshal_cbor()?)?;
        Ok(cid)
    }

    pub fn get(&self, cid: &Cid) -> Result<Option<BlockHeader>, Error> {
        match self.store.read(block_key(cid))? {
            Some(bytes) => Ok(Some(BlockHeader::unmarshal_cbor(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use address::Address;
    use db::MemoryDB;

    #[test]
    fn put_then_get_round_trips() {
        let mgr = BlockManager::new(MemoryDB::default());
        let header = BlockHeader::builder()
            .miner_address(Address::new_id(1000))
            .build()
            .unwrap();
        let cid = mgr.put(&header).unwrap();
        let back = mgr.get(&cid).unwrap().unwrap();
        assert_eq!(back.miner_address(), header.miner_address());
    }

    #[test]
    fn missing_block_is_none() {
        let mgr = BlockManager::new(MemoryDB::default());
        let header = BlockHeader::builder()
            .miner_address(Address::new_id(1))
            .build()
            .unwrap();
        assert_eq!(mgr.get(&header.cid().unwrap()).unwrap(), None);
    }
}
