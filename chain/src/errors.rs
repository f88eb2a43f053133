// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no record found for key: {0}")]
    NotFound(String),
    #[error("key-value store error: {0}")]
    Store(String),
    #[error("blockchain structure error: {0}")]
    Blockchain(String),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("deal proposal has no wallet set")]
    MissingWallet,
    #[error("no private key known for address: {0}")]
    UnknownPrivateKey(String),
    #[error("object not found or store timed out")]
    ObjectNotFound,
    #[error("{0}")]
    Other(String),
}

impl From<db::Error> for Error {
    fn from(e: db::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<blocks::Error> for Error {
    fn from(e: blocks::Error) -> Self {
        Error::Blockchain(e.to_string())
    }
}

impl From<encoding::Error> for Error {
    fn from(e: encoding::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

impl From<message::Error> for Error {
    fn from(e: message::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}
