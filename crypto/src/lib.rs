// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
pub mod signature;
mod signer;
pub mod vrf;

pub use self::errors::Error;
pub use self::signature::*;
pub use self::signer::*;
pub use self::vrf::*;
