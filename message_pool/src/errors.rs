// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Message pool error.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("method is not supported, only value transfers (method 0) are")]
    UnsupportedMethod,
    #[error("nonce is invalid for this message")]
    InvalidNonce,
    #[error("from or to address uses a protocol that cannot send or receive funds")]
    InvalidProtocol,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("sender does not have enough funds to cover this message and the rest of the pool")]
    InsufficientFunds,
    #[error("message with this sequence is already in the pool")]
    DuplicateSequence,
    #[error("{0}")]
    Other(String),
}

impl From<message::Error> for Error {
    fn from(e: message::Error) -> Self {
        Error::Other(e.to_string())
    }
}
