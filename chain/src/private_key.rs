// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use address::Address;
use db::Store;
use key_management::KeyInfo;

use crate::Error;

fn private_key_key(addr: &Address) -> String {
    format!("privateKeys/{addr}")
}

/// Durable store for simulator-managed private key material, keyed by
/// address (`privateKeys/<address>`). Distinct from `key_management`'s
/// in-memory `Wallet`/`KeyStore`: this manager is the persistence side,
/// consulted by the deal engine when it needs the signing key behind a
/// `proposal.wallet` address.
pub struct PrivateKeyManager<BS> {
    store: BS,
}

impl<BS: Store> PrivateKeyManager<BS> {
    pub fn new(store: BS) -> Self {
        Self { store }
    }

    pub fn get(&self, addr: &Address) -> Result<Option<KeyInfo>, Error> {
        match self.store.read(private_key_key(addr))? {
            Some(bytes) => {
                let info: KeyInfo = encoding::from_slice(&bytes).map_err(|e| Error::Encoding(e.to_string()))?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, addr: &Address, key_info: &KeyInfo) -> Result<(), Error> {
        let bytes = encoding::to_vec(key_info).map_err(|e| Error::Encoding(e.to_string()))?;
        self.store.write(private_key_key(addr), bytes)?;
        Ok(())
    }

    pub fn has(&self, addr: &Address) -> Result<bool, Error> {
        Ok(self.store.exists(private_key_key(addr))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::SignatureType;
    use db::MemoryDB;

    #[test]
    fn missing_key_returns_none() {
        let mgr = PrivateKeyManager::new(MemoryDB::default());
        assert_eq!(mgr.get(&Address::new_id(1)).unwrap(), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let mgr = PrivateKeyManager::new(MemoryDB::default());
        let addr = Address::new_id(1);
        let info = KeyInfo::new(SignatureType::Secp256k1, vec![1, 2, 3]);
        mgr.put(&addr, &info).unwrap();
        assert!(mgr.has(&addr).unwrap());
        assert_eq!(mgr.get(&addr).unwrap(), Some(info));
    }
}
