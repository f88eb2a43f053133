// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod keystore;
mod wallet;

pub use errors::*;
pub use keystore::*;
pub use wallet::*;
