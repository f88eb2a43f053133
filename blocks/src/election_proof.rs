// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use encoding::tuple::*;

/// Proof of winning an election to mine a block. The simulator elects the
/// single in-process miner unconditionally, so `win_count` always defaults
/// to 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ElectionProof {
    pub win_count: i64,
}

impl Default for ElectionProof {
    fn default() -> Self {
        Self { win_count: 1 }
    }
}
