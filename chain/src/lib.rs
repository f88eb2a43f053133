// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod account;
mod block;
mod block_messages;
mod deal;
mod errors;
mod private_key;
mod signed_message;
mod tipset;

pub use account::*;
pub use block::*;
pub use block_messages::*;
pub use deal::*;
pub use errors::*;
pub use private_key::*;
pub use signed_message::*;
pub use tipset::*;
