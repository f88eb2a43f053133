// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Address;
use encoding::tuple::*;
use encoding::Cbor;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// The only method number accepted by this simulator: a plain value
/// transfer, with no gas metering of contract execution.
pub const METHOD_SEND: u64 = 0;

/// An unsigned message. All integer fields are non-negative; enforcement
/// of that, and of `method == METHOD_SEND`, is the message validator's
/// job, not this type's.
#[derive(Clone, Debug, PartialEq, Serialize_tuple, Deserialize_tuple)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: BigInt,
    pub method: u64,
    pub gas_limit: u64,
    pub gas_fee_cap: BigInt,
    pub gas_premium: BigInt,
}

impl Cbor for Message {}

impl Message {
    /// `gasFeeCap * gasLimit + value`, the balance a sender must have on
    /// hand for this message to be admitted to the pool.
    pub fn required_funds(&self) -> BigInt {
        self.gas_fee_cap.clone() * BigInt::from(self.gas_limit) + self.value.clone()
    }

    /// The base fee burned to the well-known sink, and the reward paid
    /// to the miner, are the same quantity in this simplified model:
    /// `gasFeeCap * gasLimit`. A zero `gasPremium` therefore still pays
    /// the miner; premium only matters for fee-priority ordering, which
    /// this simulator doesn't implement.
    pub fn miner_fee(&self) -> BigInt {
        self.gas_fee_cap.clone() * BigInt::from(self.gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(value: u64, gas_limit: u64, gas_fee_cap: u64) -> Message {
        Message {
            from: Address::new_id(1),
            to: Address::new_id(2),
            nonce: 0,
            value: BigInt::from(value),
            method: METHOD_SEND,
            gas_limit,
            gas_fee_cap: BigInt::from(gas_fee_cap),
            gas_premium: BigInt::from(0u64),
        }
    }

    #[test]
    fn required_funds_combines_gas_and_value() {
        let m = msg(10, 1, 1);
        assert_eq!(m.required_funds(), BigInt::from(11));
    }

    #[test]
    fn cbor_roundtrip() {
        let m = msg(10, 1, 1);
        let bz = m.marshal_cbor().unwrap();
        let back = Message::unmarshal_cbor(&bz).unwrap();
        assert_eq!(m, back);
    }
}
