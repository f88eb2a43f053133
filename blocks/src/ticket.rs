// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crypto::VRFProof;
use encoding::tuple::*;

/// A Ticket is a marker of a tick of the blockchain's clock. It is the
/// source of randomness for leader election. The simulator never runs real
/// leader election, so the VRF proof is opaque PRNG output.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct Ticket {
    pub vrfproof: VRFProof,
}

impl Ticket {
    pub fn new(vrfproof: VRFProof) -> Self {
        Self { vrfproof }
    }
}
