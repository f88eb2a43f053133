// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("key info not found")]
    KeyInfo,
    #[error("key already exists")]
    KeyExists,
    #[error("{0}")]
    Other(String),
}

impl From<crypto::Error> for Error {
    fn from(e: crypto::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<address::Error> for Error {
    fn from(e: address::Error) -> Self {
        Error::Other(e.to_string())
    }
}
