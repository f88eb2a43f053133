// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod message;
mod signed_message;

pub use errors::*;
pub use message::*;
pub use signed_message::*;
