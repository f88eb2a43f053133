// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Address;
use cid::Cid;
use crypto::Signature;
use encoding::Cbor;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{Error, Message};

/// A [`Message`] paired with the signature authorizing it. Carries a
/// derived CID of its canonical CBOR encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedMessage {
    message: Message,
    signature: Signature,
}

impl Cbor for SignedMessage {}

impl SignedMessage {
    pub fn new_unchecked(message: Message, signature: Signature) -> Self {
        Self { message, signature }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn from(&self) -> &Address {
        &self.message.from
    }

    pub fn to(&self) -> &Address {
        &self.message.to
    }

    pub fn nonce(&self) -> u64 {
        self.message.nonce
    }

    pub fn value(&self) -> &BigInt {
        &self.message.value
    }

    pub fn method(&self) -> u64 {
        self.message.method
    }

    pub fn gas_limit(&self) -> u64 {
        self.message.gas_limit
    }

    pub fn gas_fee_cap(&self) -> &BigInt {
        &self.message.gas_fee_cap
    }

    pub fn gas_premium(&self) -> &BigInt {
        &self.message.gas_premium
    }

    pub fn required_funds(&self) -> BigInt {
        self.message.required_funds()
    }

    pub fn miner_fee(&self) -> BigInt {
        self.message.miner_fee()
    }

    /// Checks the signature against the canonical encoding of the
    /// enclosed message, dispatching on the sender's address protocol.
    pub fn verify_signature(&self) -> Result<(), Error> {
        let bytes = self.message.marshal_cbor()?;
        self.signature.verify(&bytes, &self.message.from)?;
        Ok(())
    }

    pub fn cid(&self) -> Result<Cid, Error> {
        Ok(encoding::cid_from_cbor(&self.marshal_cbor()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_is_stable() {
        let msg = Message {
            from: Address::new_id(1),
            to: Address::new_id(2),
            nonce: 0,
            value: BigInt::from(0u64),
            method: 0,
            gas_limit: 1,
            gas_fee_cap: BigInt::from(1u64),
            gas_premium: BigInt::from(0u64),
        };
        let signed = SignedMessage::new_unchecked(msg, Signature::new_secp256k1(vec![0; 65]));
        assert_eq!(signed.cid().unwrap(), signed.cid().unwrap());
    }
}
