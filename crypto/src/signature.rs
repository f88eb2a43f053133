// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use address::{Address, Protocol};
use bls_signatures::{
    verify_messages, PublicKey as BlsPubKey, Serialize as BlsSerialize, Signature as BlsSignature,
};
use bls_signatures::PrivateKey as BlsPrivateKey;
use libsecp256k1::{recover, sign, Message, PublicKey, RecoveryId, SecretKey, Signature as EcdsaSignature};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use rand::{CryptoRng, RngCore};
use serde::{de, ser, Deserialize, Serialize};

use crate::errors::Error;

/// BLS signature length in bytes.
pub const BLS_SIG_LEN: usize = 96;
/// Secp256k1 signature length in bytes (64-byte signature + 1-byte recovery id).
pub const SECP_SIG_LEN: usize = 65;

/// Signature variants for Filecoin signatures.
#[derive(Clone, Debug, PartialEq, FromPrimitive, Copy, Eq, Serialize, Deserialize, Hash)]
#[repr(u8)]
pub enum SignatureType {
    Secp256k1 = 1,
    BLS = 2,
}

/// A cryptographic signature, represented in bytes, of any key protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    sig_type: SignatureType,
    bytes: Vec<u8>,
}

impl ser::Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut bytes = Vec::with_capacity(self.bytes.len() + 1);
        bytes.push(self.sig_type as u8);
        bytes.extend_from_slice(&self.bytes);
        serde_bytes::Serialize::serialize(&bytes, serializer)
    }
}

impl<'de> de::Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let bytes: Cow<'de, [u8]> = serde_bytes::Deserialize::deserialize(deserializer)?;
        if bytes.is_empty() {
            return Err(de::Error::custom("Cannot deserialize empty bytes"));
        }
        let sig_type = SignatureType::from_u8(bytes[0])
            .ok_or_else(|| de::Error::custom("Invalid signature type byte (must be 1 or 2)"))?;
        Ok(Signature {
            bytes: bytes[1..].to_vec(),
            sig_type,
        })
    }
}

impl Signature {
    pub fn new_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Secp256k1,
            bytes,
        }
    }

    pub fn new_bls(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::BLS,
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn signature_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Checks if a signature is valid given data and address. Only BLS and
    /// SECP256K1 addresses can carry a verifiable signature.
    pub fn verify(&self, data: &[u8], addr: &Address) -> Result<(), Error> {
        match addr.protocol() {
            Protocol::Bls => verify_bls_sig(self.bytes(), data, addr),
            Protocol::Secp256k1 => verify_secp256k1_sig(self.bytes(), data, addr),
            _ => Err(Error::InvalidSignature),
        }
    }
}

/// Hashes `ingest` to the 32-byte digest this crate signs over. Exposed so
/// other crates (e.g. `key_management`) hash the same way before calling
/// [`sign_secp256k1`]/[`ecrecover`] rather than carrying their own copy.
pub fn blake2b_256(ingest: &[u8]) -> [u8; 32] {
    let digest = blake2b_simd::Params::new()
        .hash_length(32)
        .to_state()
        .update(ingest)
        .finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_bytes());
    out
}

pub(crate) fn verify_bls_sig(signature: &[u8], data: &[u8], addr: &Address) -> Result<(), Error> {
    let pub_k = addr.payload_bytes();
    let pk = BlsPubKey::from_bytes(pub_k).map_err(|e| Error::InvalidRecovery(e.to_string()))?;
    let sig =
        BlsSignature::from_bytes(signature).map_err(|e| Error::InvalidRecovery(e.to_string()))?;
    if verify_messages(&sig, &[data], &[pk]) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

fn verify_secp256k1_sig(signature: &[u8], data: &[u8], addr: &Address) -> Result<(), Error> {
    if signature.len() != SECP_SIG_LEN {
        return Err(Error::InvalidRecovery(format!(
            "Invalid Secp256k1 signature length. Was {}, must be {SECP_SIG_LEN}",
            signature.len()
        )));
    }
    let hash = blake2b_256(data);
    let mut sig = [0u8; SECP_SIG_LEN];
    sig.copy_from_slice(signature);
    let rec_addr = ecrecover(&hash, &sig)?;
    if rec_addr.payload_bytes() == addr.payload_bytes() {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// Aggregates and verifies BLS signatures collectively.
pub fn verify_bls_aggregate(data: &[&[u8]], pub_keys: &[&[u8]], aggregate_sig: &Signature) -> bool {
    if data.len() != pub_keys.len() {
        return false;
    }
    if data.is_empty() {
        return true;
    }
    let sig = match BlsSignature::from_bytes(aggregate_sig.bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    let pks: Result<Vec<_>, _> = pub_keys.iter().map(|x| BlsPubKey::from_bytes(x)).collect();
    let pks = match pks {
        Ok(v) => v,
        Err(_) => return false,
    };
    verify_messages(&sig, data, &pks[..])
}

/// Recovers the signing [`Address`] from a message hash and a 65-byte
/// SECP256K1 signature (64-byte signature + 1-byte recovery id).
pub fn ecrecover(hash: &[u8; 32], signature: &[u8; SECP_SIG_LEN]) -> Result<Address, Error> {
    let rec_id = RecoveryId::parse(signature[64])
        .map_err(|e| Error::InvalidRecovery(format!("{e:?}")))?;
    let message = Message::parse(hash);
    let mut s = [0u8; 64];
    s.copy_from_slice(&signature[..64]);
    let sig =
        EcdsaSignature::parse_standard(&s).map_err(|e| Error::InvalidRecovery(format!("{e:?}")))?;
    let key = recover(&message, &sig, &rec_id).map_err(|e| Error::InvalidRecovery(format!("{e:?}")))?;
    Ok(Address::new_secp256k1(key.serialize().to_vec()))
}

/// Signs `hash` with a raw SECP256K1 private key, producing a recoverable
/// 65-byte signature.
pub fn sign_secp256k1(private_key: &[u8], hash: &[u8; 32]) -> Result<Vec<u8>, Error> {
    let sk = SecretKey::parse_slice(private_key)
        .map_err(|e| Error::SigningError(format!("{e:?}")))?;
    let message = Message::parse(hash);
    let (sig, recovery_id) = sign(&message, &sk);
    let mut out = [0u8; SECP_SIG_LEN];
    out[..64].copy_from_slice(&sig.serialize());
    out[64] = recovery_id.serialize();
    Ok(out.to_vec())
}

pub fn secp256k1_public_key(private_key: &[u8]) -> Result<Vec<u8>, Error> {
    let sk = SecretKey::parse_slice(private_key)
        .map_err(|e| Error::SigningError(format!("{e:?}")))?;
    Ok(PublicKey::from_secret_key(&sk).serialize().to_vec())
}

/// Generates a new random SECP256K1 private key from `rng`. Used both for
/// the wallet's `generate_key` and for deterministic account seeding at
/// genesis, where `rng` is seeded from a wallet seed.
pub fn generate_secp256k1_private_key<R: RngCore>(rng: &mut R) -> Vec<u8> {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if SecretKey::parse(&bytes).is_ok() {
            return bytes.to_vec();
        }
    }
}

/// Generates a new random BLS private key from `rng`.
pub fn generate_bls_private_key<R: RngCore + CryptoRng>(rng: &mut R) -> Vec<u8> {
    use bls_signatures::Serialize as BlsSerialize;
    BlsPrivateKey::generate(rng).as_bytes()
}

/// Returns the BLS public key bytes for a raw BLS private key.
pub fn bls_public_key(private_key: &[u8]) -> Result<Vec<u8>, Error> {
    use bls_signatures::Serialize as BlsSerialize;
    let sk = BlsPrivateKey::from_bytes(private_key)
        .map_err(|e| Error::SigningError(e.to_string()))?;
    Ok(sk.public_key().as_bytes())
}

/// Signs `data` with a raw BLS private key.
pub fn sign_bls(private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use bls_signatures::Serialize as BlsSerialize;
    let sk = BlsPrivateKey::from_bytes(private_key)
        .map_err(|e| Error::SigningError(e.to_string()))?;
    Ok(sk.sign(data).as_bytes())
}
