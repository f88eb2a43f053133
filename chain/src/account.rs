// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use address::Address;
use db::Store;
use num_bigint::BigInt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Account ledger entry: current balance and the *next* nonce to be
/// assigned. Never destroyed once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balance: BigInt,
    pub nonce: u64,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            balance: BigInt::from(0u64),
            nonce: 0,
        }
    }
}

fn account_key(addr: &Address) -> String {
    format!("accounts/{addr}")
}

/// In-memory cache over `accounts/<address>`, write-through to the
/// backing store. Unknown addresses resolve to a lazily-created
/// zero-balance record rather than an error, so a recipient never needs
/// prior registration.
pub struct AccountManager<BS> {
    store: BS,
    cache: RwLock<HashMap<Address, Account>>,
}

impl<BS: Store> AccountManager<BS> {
    pub fn new(store: BS) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self, addr: &Address) -> Result<Account, Error> {
        match self.store.read(account_key(addr))? {
            Some(bytes) => Ok(encoding::from_slice(&bytes).map_err(|e| Error::Encoding(e.to_string()))?),
            None => Ok(Account::default()),
        }
    }

    fn persist(&self, addr: &Address, account: &Account) -> Result<(), Error> {
        let bytes = encoding::to_vec(account).map_err(|e| Error::Encoding(e.to_string()))?;
        self.store.write(account_key(addr), bytes)?;
        Ok(())
    }

    /// Returns the current snapshot for `addr`, creating and persisting a
    /// zero-balance record on first access (`getAccount`).
    pub fn get_account(&self, addr: &Address) -> Result<Account, Error> {
        if let Some(account) = self.cache.read().get(addr) {
            return Ok(account.clone());
        }
        let account = self.load(addr)?;
        self.persist(addr, &account)?;
        self.cache.write().insert(addr.clone(), account.clone());
        Ok(account)
    }

    pub fn nonce(&self, addr: &Address) -> Result<u64, Error> {
        Ok(self.get_account(addr)?.nonce)
    }

    pub fn balance(&self, addr: &Address) -> Result<BigInt, Error> {
        Ok(self.get_account(addr)?.balance)
    }

    /// Atomic debit-then-credit. Returns `false`, with no mutation at all,
    /// if `from`'s balance is insufficient.
    pub fn transfer_funds(&self, from: &Address, to: &Address, amount: &BigInt) -> Result<bool, Error> {
        let mut from_account = self.get_account(from)?;
        if from_account.balance < *amount {
            return Ok(false);
        }
        let mut to_account = self.get_account(to)?;

        from_account.balance -= amount;
        to_account.balance += amount;

        self.persist(from, &from_account)?;
        self.persist(to, &to_account)?;
        self.cache.write().insert(from.clone(), from_account);
        self.cache.write().insert(to.clone(), to_account);
        Ok(true)
    }

    pub fn increment_nonce(&self, addr: &Address) -> Result<(), Error> {
        let mut account = self.get_account(addr)?;
        account.nonce += 1;
        self.persist(addr, &account)?;
        self.cache.write().insert(addr.clone(), account);
        Ok(())
    }

    /// Mints `amount` into `addr` out of thin air, with no debited
    /// counterpart. Only genesis seeding calls this; every other balance
    /// change in the ledger goes through [`Self::transfer_funds`].
    pub fn credit(&self, addr: &Address, amount: &BigInt) -> Result<(), Error> {
        let mut account = self.get_account(addr)?;
        account.balance += amount;
        self.persist(addr, &account)?;
        self.cache.write().insert(addr.clone(), account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::MemoryDB;

    #[test]
    fn unknown_address_is_zero_balance() {
        let mgr = AccountManager::new(MemoryDB::default());
        let addr = Address::new_id(1000);
        let account = mgr.get_account(&addr).unwrap();
        assert_eq!(account.balance, BigInt::from(0u64));
        assert_eq!(account.nonce, 0);
    }

    #[test]
    fn transfer_moves_funds_both_ways() {
        let mgr = AccountManager::new(MemoryDB::default());
        let a = Address::new_id(1);
        let b = Address::new_id(2);
        mgr.cache.write().insert(
            a.clone(),
            Account {
                balance: BigInt::from(100u64),
                nonce: 0,
            },
        );
        mgr.persist(&a, &mgr.get_account(&a).unwrap()).unwrap();

        assert!(mgr.transfer_funds(&a, &b, &BigInt::from(40u64)).unwrap());
        assert_eq!(mgr.balance(&a).unwrap(), BigInt::from(60u64));
        assert_eq!(mgr.balance(&b).unwrap(), BigInt::from(40u64));
    }

    #[test]
    fn insufficient_balance_leaves_both_accounts_untouched() {
        let mgr = AccountManager::new(MemoryDB::default());
        let a = Address::new_id(1);
        let b = Address::new_id(2);

        assert!(!mgr.transfer_funds(&a, &b, &BigInt::from(1u64)).unwrap());
        assert_eq!(mgr.balance(&a).unwrap(), BigInt::from(0u64));
        assert_eq!(mgr.balance(&b).unwrap(), BigInt::from(0u64));
    }

    #[test]
    fn credit_mints_balance_with_no_source_account() {
        let mgr = AccountManager::new(MemoryDB::default());
        let addr = Address::new_id(42);
        mgr.credit(&addr, &BigInt::from(500u64)).unwrap();
        assert_eq!(mgr.balance(&addr).unwrap(), BigInt::from(500u64));
    }

    #[test]
    fn increment_nonce_persists() {
        let mgr = AccountManager::new(MemoryDB::default());
        let addr = Address::new_id(7);
        mgr.increment_nonce(&addr).unwrap();
        mgr.increment_nonce(&addr).unwrap();
        assert_eq!(mgr.nonce(&addr).unwrap(), 2);
    }
}
