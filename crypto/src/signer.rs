// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::errors::Error;
use super::signature::Signature;
use address::Address;

/// A Signer is a key implementation able to sign data for an address.
pub trait Signer {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> Result<Signature, Error>;
}
