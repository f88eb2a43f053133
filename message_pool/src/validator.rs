// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use message::{Message, METHOD_SEND};

use crate::Error;

/// Method and address-protocol checks shared by both submission paths.
/// Signature verification happens separately, against the signed
/// envelope, once the pool has stamped in a nonce.
pub fn check_method_and_protocol(msg: &Message) -> Result<(), Error> {
    if msg.method != METHOD_SEND {
        return Err(Error::UnsupportedMethod);
    }
    if !msg.from.is_valid_transfer_endpoint() || !msg.to.is_valid_transfer_endpoint() {
        return Err(Error::InvalidProtocol);
    }
    Ok(())
}

/// Full check at the public, unsigned submission boundary (`push`):
/// additionally requires the caller's `nonce` to be the `0` sentinel,
/// since the engine — not the caller — assigns the real nonce.
pub fn check_submission(msg: &Message) -> Result<(), Error> {
    check_method_and_protocol(msg)?;
    if msg.nonce != 0 {
        return Err(Error::InvalidNonce);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use address::Address;
    use num_bigint::BigInt;

    fn base() -> Message {
        Message {
            from: Address::new_secp256k1(vec![1; 20]),
            to: Address::new_bls(vec![2; 48]),
            nonce: 0,
            value: BigInt::from(0u64),
            method: METHOD_SEND,
            gas_limit: 1,
            gas_fee_cap: BigInt::from(1u64),
            gas_premium: BigInt::from(0u64),
        }
    }

    #[test]
    fn accepts_well_formed_message() {
        assert!(check_submission(&base()).is_ok());
    }

    #[test]
    fn rejects_nonzero_method() {
        let mut m = base();
        m.method = 2;
        assert_eq!(check_submission(&m).unwrap_err(), Error::UnsupportedMethod);
    }

    #[test]
    fn rejects_nonzero_submission_nonce() {
        let mut m = base();
        m.nonce = 1;
        assert_eq!(check_submission(&m).unwrap_err(), Error::InvalidNonce);
    }

    #[test]
    fn rejects_id_protocol_endpoints() {
        let mut m = base();
        m.to = Address::new_id(99);
        assert_eq!(check_submission(&m).unwrap_err(), Error::InvalidProtocol);
    }
}
