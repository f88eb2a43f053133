// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

/// VRF proof carried by a `Ticket`. The simulator never runs real leader
/// election, so this is opaque PRNG output rather than a verifiable VRF
/// output — the genesis ticket uses a 32-byte PRNG `vrfProof`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VRFProof(#[serde(with = "serde_bytes")] Vec<u8>);

impl VRFProof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
