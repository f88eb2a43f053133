// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Error as AddressError;
use thiserror::Error;

/// Crypto error
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to produce a signature
    #[error("Failed to sign data: {0}")]
    SigningError(String),
    /// Unable to perform ecrecover with the given params
    #[error("Could not recover public key from signature: {0}")]
    InvalidRecovery(String),
    /// Signature bytes did not verify against the given message and address
    #[error("Signature verification failed")]
    InvalidSignature,
    /// Provided public key is not understood
    #[error("Invalid generated pub key to create address: {0}")]
    InvalidPubKey(#[from] AddressError),
}
