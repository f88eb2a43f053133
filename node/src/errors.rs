// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Top-level node error, consolidating every collaborator crate's error
/// type behind the handful of kinds the RPC surface actually needs to
/// distinguish.
#[derive(Debug, Error)]
pub enum Error {
    #[error("node is not ready")]
    NotReady,
    #[error(transparent)]
    Chain(#[from] chain::Error),
    #[error(transparent)]
    Blocks(#[from] blocks::Error),
    #[error(transparent)]
    Encoding(#[from] encoding::Error),
    #[error(transparent)]
    Message(#[from] message::Error),
    #[error(transparent)]
    Pool(#[from] message_pool::Error),
    #[error(transparent)]
    Store(#[from] db::Error),
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
    #[error(transparent)]
    KeyManagement(#[from] key_management::Error),
    #[error(transparent)]
    Address(#[from] address::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("deal proposal has no wallet set")]
    MissingWallet,
    #[error("{0}")]
    Other(String),
}
