// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, Store};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A thread-safe `HashMap` wrapper, the only KV backend the simulator ships
/// with (the on-disk store is out of scope, see the `chain` ledger managers).
#[derive(Debug, Default, Clone)]
pub struct MemoryDB {
    db: Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl Store for MemoryDB {
    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.db
            .write()
            .insert(key.as_ref().to_vec(), value.as_ref().to_vec());
        Ok(())
    }

    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
    {
        self.db.write().remove(key.as_ref());
        Ok(())
    }

    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>,
    {
        Ok(self.db.read().get(key.as_ref()).cloned())
    }

    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
    {
        Ok(self.db.read().contains_key(key.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let db = MemoryDB::default();
        db.write(b"account/t01000", b"balance=100").unwrap();
        assert_eq!(
            db.read(b"account/t01000").unwrap(),
            Some(b"balance=100".to_vec())
        );
    }

    #[test]
    fn missing_key_reads_none() {
        let db = MemoryDB::default();
        assert_eq!(db.read(b"nope").unwrap(), None);
        assert!(!db.exists(b"nope").unwrap());
    }

    #[test]
    fn delete_removes_key() {
        let db = MemoryDB::default();
        db.write(b"k", b"v").unwrap();
        db.delete(b"k").unwrap();
        assert!(!db.exists(b"k").unwrap());
    }

    #[test]
    fn bulk_write_and_bulk_read() {
        let db = MemoryDB::default();
        let pairs = [(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())];
        db.bulk_write(&pairs).unwrap();
        let keys = [b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let values = db.bulk_read(&keys).unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), Some(b"2".to_vec()), None]);
    }
}
