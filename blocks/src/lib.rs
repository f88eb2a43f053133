// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod election_proof;
mod epoch;
mod errors;
mod header;
mod ticket;
mod tipset;

pub use election_proof::*;
pub use epoch::*;
pub use errors::*;
pub use header::*;
pub use ticket::*;
pub use tipset::*;
