// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Address parsing/construction error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown address network")]
    UnknownNetwork,
    #[error("Unknown address protocol")]
    UnknownProtocol,
    #[error("Invalid address payload length")]
    InvalidPayloadLength,
    #[error("Invalid address checksum")]
    InvalidChecksum,
    #[error("Invalid address string: {0}")]
    InvalidString(String),
}
