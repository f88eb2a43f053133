// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use address::Address;
use crypto::{Signature, Signer, SignatureType};
use rand::{CryptoRng, RngCore};

use crate::keystore::{KeyInfo, KeyStore, Store};
use crate::Error;

fn wallet_key(addr: &Address) -> String {
    format!("wallet-{addr}")
}

/// A key resolved from the keystore: key material plus its derived
/// public key and address, cached so repeated signing doesn't re-derive
/// the public key from scratch every time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    key_info: KeyInfo,
    address: Address,
}

impl Key {
    pub fn new(key_info: KeyInfo) -> Result<Self, Error> {
        let address = address_for(key_info.key_type(), key_info.private_key())?;
        Ok(Self { key_info, address })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn key_info(&self) -> &KeyInfo {
        &self.key_info
    }
}

fn address_for(sig_type: SignatureType, private_key: &[u8]) -> Result<Address, Error> {
    let public_key = match sig_type {
        SignatureType::Secp256k1 => crypto::secp256k1_public_key(private_key)?,
        SignatureType::BLS => crypto::bls_public_key(private_key)?,
    };
    Ok(match sig_type {
        SignatureType::Secp256k1 => Address::new_secp256k1(public_key),
        SignatureType::BLS => Address::new_bls(public_key),
    })
}

fn sign_with(sig_type: SignatureType, private_key: &[u8], data: &[u8]) -> Result<Signature, Error> {
    Ok(match sig_type {
        SignatureType::Secp256k1 => {
            let hash = crypto::blake2b_256(data);
            Signature::new_secp256k1(crypto::sign_secp256k1(private_key, &hash)?)
        }
        SignatureType::BLS => Signature::new_bls(crypto::sign_bls(private_key, data)?),
    })
}

/// Signs `data` with key material resolved independently of any
/// particular [`Wallet`] instance — used by collaborators (the deal
/// engine's proposal signing) that hold a [`KeyInfo`] fetched from
/// durable storage rather than from an in-memory wallet's cache.
pub fn sign_with_key_info(key_info: &KeyInfo, data: &[u8]) -> Result<Signature, Error> {
    sign_with(key_info.key_type(), key_info.private_key(), data)
}

/// Holds generated/imported key material and resolves signing requests
/// by address, backed by an in-memory [`KeyStore`].
#[derive(Clone, Debug, Default)]
pub struct Wallet {
    keys: HashMap<Address, Key>,
    keystore: KeyStore,
}

impl Wallet {
    pub fn new(keystore: KeyStore) -> Self {
        Self {
            keys: HashMap::new(),
            keystore,
        }
    }

    fn find_key(&mut self, addr: &Address) -> Result<Key, Error> {
        if let Some(k) = self.keys.get(addr) {
            return Ok(k.clone());
        }
        let key_info = self.keystore.get(&wallet_key(addr))?;
        let key = Key::new(key_info)?;
        self.keys.insert(addr.clone(), key.clone());
        Ok(key)
    }

    pub fn export(&mut self, addr: &Address) -> Result<KeyInfo, Error> {
        Ok(self.find_key(addr)?.key_info().clone())
    }

    pub fn import(&mut self, key_info: KeyInfo) -> Result<Address, Error> {
        let key = Key::new(key_info)?;
        self.keystore.put(wallet_key(key.address()), key.key_info().clone())?;
        let addr = key.address().clone();
        self.keys.insert(addr.clone(), key);
        Ok(addr)
    }

    pub fn list_addrs(&self) -> Vec<Address> {
        let mut addrs: Vec<Address> = self.keys.keys().cloned().collect();
        addrs.sort_by_key(|a| a.to_string());
        addrs
    }

    pub fn has_key(&mut self, addr: &Address) -> bool {
        self.find_key(addr).is_ok()
    }

    /// Generates a new key of the given type using `rng`, imports it, and
    /// returns its address. Using an explicit, injectable RNG (rather than
    /// `OsRng`) is what lets genesis account seeding be deterministic from
    /// a wallet seed.
    pub fn generate_key_with<R: RngCore + CryptoRng>(
        &mut self,
        sig_type: SignatureType,
        rng: &mut R,
    ) -> Result<Address, Error> {
        let private_key = match sig_type {
            SignatureType::Secp256k1 => crypto::generate_secp256k1_private_key(rng),
            SignatureType::BLS => crypto::generate_bls_private_key(rng),
        };
        self.import(KeyInfo::new(sig_type, private_key))
    }
}

impl Signer for Wallet {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> Result<Signature, crypto::Error> {
        let key_info = self
            .keys
            .get(address)
            .map(|k| k.key_info().clone())
            .or_else(|| self.keystore.get(&wallet_key(address)).ok())
            .ok_or(crypto::Error::InvalidSignature)?;
        sign_with(key_info.key_type(), key_info.private_key(), data)
            .map_err(|_| crypto::Error::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generate_import_and_sign_round_trip() {
        let mut wallet = Wallet::new(KeyStore::new());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let addr = wallet
            .generate_key_with(SignatureType::Secp256k1, &mut rng)
            .unwrap();

        assert!(wallet.has_key(&addr));
        let sig = wallet.sign_bytes(b"hello", &addr).unwrap();
        assert!(sig.verify(b"hello", &addr).is_ok());
    }

    #[test]
    fn same_seed_yields_same_address() {
        let mut a = Wallet::new(KeyStore::new());
        let mut b = Wallet::new(KeyStore::new());
        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);

        let addr_a = a.generate_key_with(SignatureType::Secp256k1, &mut rng_a).unwrap();
        let addr_b = b.generate_key_with(SignatureType::Secp256k1, &mut rng_b).unwrap();
        assert_eq!(addr_a, addr_b);
    }
}
