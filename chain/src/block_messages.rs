// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use db::Store;

use crate::signed_message::SignedMessageManager;
use crate::Error;
use message::SignedMessage;

pub(crate) fn block_messages_key(block_cid: &Cid) -> String {
    format!("blockMessages/{block_cid}")
}

/// Maps a block CID to the ordered CIDs of the signed messages attributed
/// to it, joining on the signed-message manager to return full messages
/// on read — all successful messages attribute to the tipset's first
/// block.
pub struct BlockMessagesManager<BS> {
    store: BS,
    signed_messages: SignedMessageManager<BS>,
}

impl<BS: Store + Clone> BlockMessagesManager<BS> {
    pub fn new(store: BS) -> Self {
        Self {
            signed_messages: SignedMessageManager::new(store.clone()),
            store,
        }
    }

    pub fn signed_messages(&self) -> &SignedMessageManager<BS> {
        &self.signed_messages
    }

    /// Persists `messages` (already written individually via
    /// [`Self::signed_messages`]) as the ordered CID list attributed to
    /// `block_cid`.
    pub fn put(&self, block_cid: &Cid, messages: &[SignedMessage]) -> Result<(), Error> {
        let cids: Vec<Cid> = messages.iter().map(|m| m.cid()).collect::<Result<_, _>>()?;
        let bytes = encoding::to_vec(&cids).map_err(|e| Error::Encoding(e.to_string()))?;
        self.store.write(block_messages_key(block_cid), bytes)?;
        Ok(())
    }

    pub fn get(&self, block_cid: &Cid) -> Result<Vec<SignedMessage>, Error> {
        let bytes = match self.store.read(block_messages_key(block_cid))? {
            Some(bytes) => bytes,
            None => return Ok(Vec::new()),
        };
        let cids: Vec<Cid> = encoding::from_slice(&bytes).map_err(|e| Error::Encoding(e.to_string()))?;
        let mut messages = Vec::with_capacity(cids.len());
        for cid in &cids {
            let msg = self
                .signed_messages
                .get(cid)?
                .ok_or_else(|| Error::NotFound(format!("signed message {cid}")))?;
            messages.push(msg);
        }
        Ok(messages)
    }
}
