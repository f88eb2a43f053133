// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use db::Store;
use encoding::Cbor;
use message::SignedMessage;

use crate::Error;

fn signed_message_key(cid: &Cid) -> String {
    format!("signedMessages/{cid}")
}

/// Write-through store for signed messages, keyed by their own CID
/// (`signedMessages/<cid>`).
pub struct SignedMessageManager<BS> {
    store: BS,
}

impl<BS: Store> SignedMessageManager<BS> {
    pub fn new(store: BS) -> Self {
        Self { store }
    }

    pub fn put(&self, msg: &SignedMessage) -> Result<Cid, Error> {
        let cid = msg.cid()?;
        self.store.write(signed_message_key(&cid), msg.marshal_cbor()?)?;
        Ok(cid)
    }

    pub fn get(&self, cid: &Cid) -> Result<Option<SignedMessage>, Error> {
        match self.store.read(signed_message_key(cid))? {
            Some(bytes) => Ok(Some(SignedMessage::unmarshal_cbor(&bytes)?)),
            None => Ok(None),
        }
    }
}
