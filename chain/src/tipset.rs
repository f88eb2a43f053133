// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use byteorder::{BigEndian, ByteOrder};
use cid::Cid;
use db::Store;
use parking_lot::RwLock;

use blocks::{ChainEpoch, Tipset};
use message::SignedMessage;

use crate::block::BlockManager;
use crate::block_messages::block_messages_key;
use crate::Error;

const LATEST_TIPSET_KEY: &str = "latest-tipset";

fn tipset_key(height: ChainEpoch) -> String {
    format!("tipsets/{height}")
}

fn encode_height(height: ChainEpoch) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, height as u64);
    buf
}

fn decode_height(bytes: &[u8]) -> ChainEpoch {
    BigEndian::read_u64(bytes) as ChainEpoch
}

/// Tracks persisted tipsets by height (`tipsets/<height>`) and the
/// top-level `latest-tipset` pointer, joining on the block manager to
/// reconstruct full [`Tipset`]s on read.
pub struct TipsetManager<BS> {
    store: BS,
    blocks: BlockManager<BS>,
    latest_height: RwLock<Option<ChainEpoch>>,
}

impl<BS: Store + Clone> TipsetManager<BS> {
    /// Warms the `latest` cache from the store's `latest-tipset` pointer,
    /// if present — this is how a restarted node recovers its tip.
    pub fn new(store: BS) -> Result<Self, Error> {
        let latest_height = store
            .read(LATEST_TIPSET_KEY)?
            .map(|bytes| decode_height(&bytes));
        Ok(Self {
            blocks: BlockManager::new(store.clone()),
            store,
            latest_height: RwLock::new(latest_height),
        })
    }

    pub fn blocks(&self) -> &BlockManager<BS> {
        &self.blocks
    }

    /// Persists `tipset` at its height and advances the `latest-tipset`
    /// pointer. Does not persist the constituent blocks — callers persist
    /// those via [`TipsetManager::blocks`] first.
    pub fn put_tipset(&self, tipset: &Tipset) -> Result<(), Error> {
        let height = tipset.epoch();
        let bytes = encoding::to_vec(&tipset.cids()).map_err(|e| Error::Encoding(e.to_string()))?;
        self.store.write(tipset_key(height), bytes)?;
        self.store.write(LATEST_TIPSET_KEY, encode_height(height))?;
        *self.latest_height.write() = Some(height);
        Ok(())
    }

    /// Commits a mined tipset and the message index of its first block in
    /// one [`Store::bulk_write`] call. Mining steps 5 and 6 must land
    /// together or not at all — a node that restarts between a
    /// `blockMessages` write and a `latest-tipset` advance would expose a
    /// tipset whose messages can't be listed, or advance the tip without
    /// ever recording what it contained. Block headers and signed messages
    /// themselves are content-addressed and already durable by this point;
    /// only the two index writes need to be atomic.
    pub fn commit_with_block_messages(
        &self,
        tipset: &Tipset,
        first_block: &Cid,
        messages: &[SignedMessage],
    ) -> Result<(), Error> {
        let height = tipset.epoch();
        let tipset_bytes =
            encoding::to_vec(&tipset.cids()).map_err(|e| Error::Encoding(e.to_string()))?;
        let message_cids: Vec<Cid> = messages.iter().map(|m| m.cid()).collect::<Result<_, _>>()?;
        let block_messages_bytes =
            encoding::to_vec(&message_cids).map_err(|e| Error::Encoding(e.to_string()))?;

        self.store.bulk_write(&[
            (block_messages_key(first_block), block_messages_bytes),
            (tipset_key(height), tipset_bytes),
            (LATEST_TIPSET_KEY.to_string(), encode_height(height).to_vec()),
        ])?;
        *self.latest_height.write() = Some(height);
        Ok(())
    }

    pub fn latest_height(&self) -> Option<ChainEpoch> {
        *self.latest_height.read()
    }

    /// Reconstructs the tipset at `height` from its persisted block CIDs,
    /// returning `None` if no tipset was ever committed at that height
    /// (`getTipsetWithBlocks`).
    pub fn get_tipset_with_blocks(&self, height: ChainEpoch) -> Result<Option<Tipset>, Error> {
        let bytes = match self.store.read(tipset_key(height))? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let cids: Vec<Cid> = encoding::from_slice(&bytes).map_err(|e| Error::Encoding(e.to_string()))?;
        let mut headers = Vec::with_capacity(cids.len());
        for cid in &cids {
            let header = self
                .blocks
                .get(cid)?
                .ok_or_else(|| Error::NotFound(format!("block {cid}")))?;
            headers.push(header);
        }
        Ok(Some(Tipset::new(headers)?))
    }

    pub fn latest_tipset(&self) -> Result<Option<Tipset>, Error> {
        match self.latest_height() {
            Some(height) => self.get_tipset_with_blocks(height),
            None => Ok(None),
        }
    }

    pub fn genesis_tipset(&self) -> Result<Option<Tipset>, Error> {
        self.get_tipset_with_blocks(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use address::Address;
    use blocks::BlockHeader;
    use db::MemoryDB;

    fn header(miner: u64, height: ChainEpoch) -> BlockHeader {
        BlockHeader::builder()
            .miner_address(Address::new_id(miner))
            .height(height)
            .build()
            .unwrap()
    }

    #[test]
    fn put_and_read_back_latest() {
        let store = MemoryDB::default();
        let mgr = TipsetManager::new(store).unwrap();
        let genesis = Tipset::new(vec![header(1000, 0)]).unwrap();
        mgr.blocks().put(&genesis.blocks()[0]).unwrap();
        mgr.put_tipset(&genesis).unwrap();

        assert_eq!(mgr.latest_height(), Some(0));
        let back = mgr.latest_tipset().unwrap().unwrap();
        assert_eq!(back.cids(), genesis.cids());
    }

    #[test]
    fn restart_recovers_latest_tipset_from_store() {
        let store = MemoryDB::default();
        {
            let mgr = TipsetManager::new(store.clone()).unwrap();
            let genesis = Tipset::new(vec![header(1000, 0)]).unwrap();
            mgr.blocks().put(&genesis.blocks()[0]).unwrap();
            mgr.put_tipset(&genesis).unwrap();
            let next = Tipset::new(vec![header(1000, 1)]).unwrap();
            mgr.blocks().put(&next.blocks()[0]).unwrap();
            mgr.put_tipset(&next).unwrap();
        }

        let reopened = TipsetManager::new(store).unwrap();
        assert_eq!(reopened.latest_height(), Some(1));
    }

    #[test]
    fn commit_with_block_messages_lands_both_indexes() {
        use crate::block_messages::BlockMessagesManager;
        use address::Address as Addr;
        use crypto::Signature;
        use encoding::Cbor;
        use message::Message;
        use num_bigint::BigInt;

        let store = MemoryDB::default();
        let mgr = TipsetManager::new(store.clone()).unwrap();
        let block_messages = BlockMessagesManager::new(store);

        let genesis = Tipset::new(vec![header(1000, 0)]).unwrap();
        mgr.blocks().put(&genesis.blocks()[0]).unwrap();
        let block_cid = genesis.blocks()[0].cid().unwrap();

        let msg = Message {
            from: Addr::new_id(1),
            to: Addr::new_id(2),
            nonce: 0,
            value: BigInt::from(0u64),
            method: 0,
            gas_limit: 1,
            gas_fee_cap: BigInt::from(1u64),
            gas_premium: BigInt::from(0u64),
        };
        let signed = SignedMessage::new_unchecked(msg, Signature::new_secp256k1(vec![0; 65]));
        block_messages.signed_messages().put(&signed).unwrap();

        mgr.commit_with_block_messages(&genesis, &block_cid, &[signed.clone()])
            .unwrap();

        assert_eq!(mgr.latest_height(), Some(0));
        assert_eq!(block_messages.get(&block_cid).unwrap(), vec![signed]);
    }

    #[test]
    fn missing_height_is_none() {
        let mgr = TipsetManager::new(MemoryDB::default()).unwrap();
        assert!(mgr.get_tipset_with_blocks(5).unwrap().is_none());
    }
}
