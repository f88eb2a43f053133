// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use crypto::SignatureType;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Key material plus the signature scheme it belongs to. Private-key
/// durability for the simulator's accounts goes through the
/// `privateKeys/<address>` KV namespace, owned by `chain`'s private-key
/// manager; this `KeyInfo`/`KeyStore` pair is the in-memory shape the
/// wallet keeps its working set in, without file-backed persistence or
/// encryption layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    key_type: SignatureType,
    private_key: Vec<u8>,
}

impl KeyInfo {
    pub fn new(key_type: SignatureType, private_key: Vec<u8>) -> Self {
        Self {
            key_type,
            private_key,
        }
    }

    pub fn key_type(&self) -> SignatureType {
        self.key_type
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

/// A resolvable-by-name set of [`KeyInfo`] entries.
pub trait Store {
    fn list(&self) -> Vec<String>;
    fn get(&self, k: &str) -> Result<KeyInfo, Error>;
    fn put(&mut self, key: String, key_info: KeyInfo) -> Result<(), Error>;
    fn remove(&mut self, key: String) -> Result<KeyInfo, Error>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyStore {
    key_info: HashMap<String, KeyInfo>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for KeyStore {
    fn list(&self) -> Vec<String> {
        self.key_info.keys().cloned().collect()
    }

    fn get(&self, k: &str) -> Result<KeyInfo, Error> {
        self.key_info.get(k).cloned().ok_or(Error::KeyInfo)
    }

    fn put(&mut self, key: String, key_info: KeyInfo) -> Result<(), Error> {
        if self.key_info.contains_key(&key) {
            return Err(Error::KeyExists);
        }
        self.key_info.insert(key, key_info);
        Ok(())
    }

    fn remove(&mut self, key: String) -> Result<KeyInfo, Error> {
        self.key_info.remove(&key).ok_or(Error::KeyInfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut ks = KeyStore::new();
        let info = KeyInfo::new(SignatureType::Secp256k1, vec![1, 2, 3]);
        ks.put("wallet-x".into(), info.clone()).unwrap();
        assert_eq!(ks.get("wallet-x").unwrap(), info);
    }

    #[test]
    fn put_duplicate_key_rejected() {
        let mut ks = KeyStore::new();
        let info = KeyInfo::new(SignatureType::Secp256k1, vec![1]);
        ks.put("a".into(), info.clone()).unwrap();
        assert_eq!(ks.put("a".into(), info).unwrap_err(), Error::KeyExists);
    }

    #[test]
    fn remove_missing_key_errors() {
        let mut ks = KeyStore::new();
        assert_eq!(ks.remove("missing".into()).unwrap_err(), Error::KeyInfo);
    }
}
