// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Address;
use async_trait::async_trait;
use num_bigint::BigInt;

use crate::Error;

/// What the pool needs to know about the committed chain state to project
/// nonces and check funds. Decouples `message_pool` from the ledger
/// managers in `chain`, the way `MpoolRpcProvider` decouples the pool from
/// a `StateManager`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The sender's next-to-assign nonce, as currently committed.
    async fn account_nonce(&self, addr: &Address) -> Result<u64, Error>;

    /// The sender's currently committed balance.
    async fn account_balance(&self, addr: &Address) -> Result<BigInt, Error>;
}
