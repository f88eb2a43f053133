// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;

use async_trait::async_trait;
use chain::{Error, ObjectStat, ObjectStore};
use cid::Cid;
use parking_lot::RwLock;

/// In-memory, content-addressed object store. The 500ms operation
/// timeout required of every [`ObjectStore`] implementation is already
/// enforced by `chain`'s `with_timeout` wrapper around every call site,
/// so this implementation has no timeout logic of its own.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn stat(&self, cid: &Cid) -> Result<ObjectStat, Error> {
        let objects = self.objects.read();
        let data = objects.get(cid).ok_or(Error::ObjectNotFound)?;
        Ok(ObjectStat { size: data.len() as u64 })
    }

    async fn read(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        self.objects
            .read()
            .get(cid)
            .cloned()
            .ok_or(Error::ObjectNotFound)
    }

    async fn put(&self, data: &[u8]) -> Result<Cid, Error> {
        let cid = encoding::cid_from_cbor(data);
        self.objects.write().insert(cid, data.to_vec());
        Ok(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_stat_and_read_round_trip() {
        let store = InMemoryObjectStore::new();
        let cid = store.put(b"hello piece").await.unwrap();
        let stat = store.stat(&cid).await.unwrap();
        assert_eq!(stat.size, 11);
        assert_eq!(store.read(&cid).await.unwrap(), b"hello piece");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        let cid = encoding::cid_from_cbor(b"never stored");
        assert!(matches!(store.stat(&cid).await.unwrap_err(), Error::ObjectNotFound));
        assert!(matches!(store.read(&cid).await.unwrap_err(), Error::ObjectNotFound));
    }
}
