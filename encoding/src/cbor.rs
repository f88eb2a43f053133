// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::errors::Error;
use crate::{blake2b_256, de::DeserializeOwned, from_slice, ser::Serialize, to_vec};
use cid::Cid;
use multihash::Multihash;

/// Multicodec code for BLAKE2b-256, per the multicodec table.
const BLAKE2B_256_CODE: u64 = 0xb220;
/// Multicodec code for DAG-CBOR, per the multicodec table.
const DAG_CBOR_CODE: u64 = 0x71;

/// Computes the [`Cid`] of a raw CBOR block using a BLAKE2b-256 digest,
/// mirroring how tipsets and messages derive their content addresses.
pub fn cid_from_cbor(bytes: &[u8]) -> Cid {
    let digest = blake2b_256(bytes);
    let hash = Multihash::wrap(BLAKE2B_256_CODE, &digest).expect("digest is within size bound");
    Cid::new_v1(DAG_CBOR_CODE, hash)
}

/// Cbor utility functions for serializable objects.
pub trait Cbor: Serialize + DeserializeOwned {
    /// Marshalls cbor encodable object into cbor bytes
    fn marshal_cbor(&self) -> Result<Vec<u8>, Error> {
        Ok(to_vec(&self)?)
    }

    /// Unmarshals cbor encoded bytes to object
    fn unmarshal_cbor(bz: &[u8]) -> Result<Self, Error> {
        Ok(from_slice(bz)?)
    }

    /// Returns the content identifier of the raw block of data.
    fn cid(&self) -> Result<Cid, Error> {
        Ok(cid_from_cbor(&self.marshal_cbor()?))
    }
}

impl<T> Cbor for Vec<T> where T: Cbor {}
impl<T> Cbor for Option<T> where T: Cbor {}
