// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Filecoin-style tagged addresses.
//!
//! Only [`Protocol::Bls`] and [`Protocol::Secp256k1`] addresses may appear as
//! the sender or receiver of a value transfer; [`Protocol::Id`],
//! [`Protocol::Actor`] and [`Protocol::Unknown`] exist so the simulator can
//! represent well-known singleton actors (the burnt-funds sink, the miner)
//! and reject anything else at the validator boundary.

mod errors;

use std::fmt;
use std::str::FromStr;

use data_encoding::Encoding;
use data_encoding_macro::new_encoding;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub use errors::Error;

/// Network prefix used by this simulator. Filecoin mainnet uses `f`; we
/// always identify as testnet (`t099`, `t01000`).
pub const NETWORK_PREFIX: char = 't';

const CHECKSUM_LEN: usize = 4;

const ADDRESS_ENCODING: Encoding = new_encoding! {
    symbols: "abcdefghijklmnopqrstuvwxyz234567",
};

/// Address protocol tag, mirroring the Filecoin address protocol byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum Protocol {
    Id = 0,
    Secp256k1 = 1,
    Actor = 2,
    Bls = 3,
    Unknown = 255,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Protocol::Id => 0,
            Protocol::Secp256k1 => 1,
            Protocol::Actor => 2,
            Protocol::Bls => 3,
            Protocol::Unknown => 4,
        };
        write!(f, "{tag}")
    }
}

/// A tagged Filecoin address: a protocol byte plus a protocol-specific
/// payload. [`Protocol::Id`] addresses store the id directly; everything
/// else stores raw payload bytes (a pubkey hash, in the real protocol).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    protocol: Protocol,
    payload: Vec<u8>,
}

impl Address {
    pub fn new_id(id: u64) -> Self {
        Address {
            protocol: Protocol::Id,
            payload: id.to_be_bytes().to_vec(),
        }
    }

    pub fn new_secp256k1(payload: Vec<u8>) -> Self {
        Address {
            protocol: Protocol::Secp256k1,
            payload,
        }
    }

    pub fn new_bls(payload: Vec<u8>) -> Self {
        Address {
            protocol: Protocol::Bls,
            payload,
        }
    }

    pub fn new_actor(payload: Vec<u8>) -> Self {
        Address {
            protocol: Protocol::Actor,
            payload,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn id(&self) -> Option<u64> {
        if self.protocol != Protocol::Id {
            return None;
        }
        let mut buf = [0u8; 8];
        let offset = 8 - self.payload.len().min(8);
        buf[offset..].copy_from_slice(&self.payload[self.payload.len().saturating_sub(8)..]);
        Some(u64::from_be_bytes(buf))
    }

    /// Only BLS and SECP256K1 addresses are valid transfer endpoints.
    pub fn is_valid_transfer_endpoint(&self) -> bool {
        matches!(self.protocol, Protocol::Bls | Protocol::Secp256k1)
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let mut ingest = Vec::with_capacity(1 + self.payload.len());
        ingest.push(self.protocol as u8);
        ingest.extend_from_slice(&self.payload);
        let digest = blake2b_simd::Params::new()
            .hash_length(CHECKSUM_LEN)
            .to_state()
            .update(&ingest)
            .finalize();
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(digest.as_bytes());
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::Id => write!(f, "{}{}{}", NETWORK_PREFIX, self.protocol, self.id().unwrap_or(0)),
            _ => {
                let mut buf = self.payload.clone();
                buf.extend_from_slice(&self.checksum());
                write!(
                    f,
                    "{}{}{}",
                    NETWORK_PREFIX,
                    self.protocol,
                    ADDRESS_ENCODING.encode(&buf)
                )
            }
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 3 {
            return Err(Error::InvalidString(s.to_owned()));
        }
        let mut chars = s.chars();
        let network = chars.next().ok_or_else(|| Error::InvalidString(s.to_owned()))?;
        if network != NETWORK_PREFIX && network != 'f' {
            return Err(Error::UnknownNetwork);
        }
        let protocol_digit = chars.next().ok_or_else(|| Error::InvalidString(s.to_owned()))?;
        let rest = &s[2..];
        match protocol_digit {
            '0' => {
                let id: u64 = rest
                    .parse()
                    .map_err(|_| Error::InvalidString(s.to_owned()))?;
                Ok(Address::new_id(id))
            }
            '1' | '2' | '3' => {
                let protocol = match protocol_digit {
                    '1' => Protocol::Secp256k1,
                    '2' => Protocol::Actor,
                    '3' => Protocol::Bls,
                    _ => unreachable!(),
                };
                let decoded = ADDRESS_ENCODING
                    .decode(rest.to_lowercase().as_bytes())
                    .map_err(|_| Error::InvalidString(s.to_owned()))?;
                if decoded.len() < CHECKSUM_LEN {
                    return Err(Error::InvalidPayloadLength);
                }
                let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
                let addr = Address {
                    protocol,
                    payload: payload.to_vec(),
                };
                if addr.checksum() != checksum {
                    return Err(Error::InvalidChecksum);
                }
                Ok(addr)
            }
            _ => Err(Error::UnknownProtocol),
        }
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

/// `i64` enum values aren't needed here, but `FromPrimitive` is used for the
/// sibling `Protocol` byte coming off the wire in the real protocol; keep a
/// thin helper around so callers matching on a raw byte have a fallible path.
pub fn protocol_from_byte(byte: u8) -> Protocol {
    Protocol::from_u8(byte).unwrap_or(Protocol::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_address_roundtrip() {
        let addr = Address::new_id(1000);
        assert_eq!(addr.to_string(), "t01000");
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn burnt_funds_address_matches_well_known_constant() {
        assert_eq!(Address::new_id(99).to_string(), "t099");
    }

    #[test]
    fn secp_address_roundtrip() {
        let addr = Address::new_secp256k1(vec![1; 20]);
        let s = addr.to_string();
        let parsed: Address = s.parse().unwrap();
        assert_eq!(addr, parsed);
        assert_eq!(parsed.protocol(), Protocol::Secp256k1);
    }

    #[test]
    fn bad_checksum_rejected() {
        let addr = Address::new_bls(vec![7; 48]);
        let mut s = addr.to_string();
        let last = s.pop().unwrap();
        let replacement = if last == 'a' { 'b' } else { 'a' };
        s.push(replacement);
        assert!(s.parse::<Address>().is_err());
    }

    #[test]
    fn only_bls_and_secp_are_transfer_endpoints() {
        assert!(Address::new_bls(vec![0; 48]).is_valid_transfer_endpoint());
        assert!(Address::new_secp256k1(vec![0; 20]).is_valid_transfer_endpoint());
        assert!(!Address::new_id(1).is_valid_transfer_endpoint());
        assert!(!Address::new_actor(vec![0; 20]).is_valid_transfer_endpoint());
    }
}
