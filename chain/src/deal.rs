// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use address::Address;
use async_trait::async_trait;
use cid::Cid;
use db::Store;
use key_management::sign_with_key_info;
use num_bigint::BigInt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::account::AccountManager;
use crate::private_key::PrivateKeyManager;
use crate::Error;

/// Canonical storage-deal lifecycle: a linear chain from proposal
/// validation to sealed-and-proving. `advance_deals` moves a deal one
/// step on every mined tipset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageDealStatus {
    Validating,
    Staged,
    Sealing,
    Active,
    Expired,
}

const STATE_ORDER: [StorageDealStatus; 5] = [
    StorageDealStatus::Validating,
    StorageDealStatus::Staged,
    StorageDealStatus::Sealing,
    StorageDealStatus::Active,
    StorageDealStatus::Expired,
];

impl StorageDealStatus {
    pub fn next(self) -> Option<Self> {
        let idx = STATE_ORDER.iter().position(|s| *s == self)?;
        STATE_ORDER.get(idx + 1).copied()
    }

    pub fn is_terminal_for_tracking(self) -> bool {
        matches!(self, StorageDealStatus::Active | StorageDealStatus::Expired)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DealInfo {
    pub deal_id: u64,
    pub proposal_cid: Cid,
    pub state: StorageDealStatus,
    pub provider: Address,
    pub client: Address,
    pub piece_cid: Cid,
    pub size: u64,
    pub price_per_epoch: BigInt,
    pub duration: u64,
}

/// Parameters for `startDeal`. `wallet` is the client address whose
/// private key the engine must already know.
pub struct StartDealParams {
    pub wallet: Address,
    pub miner: Address,
    pub data_root: Cid,
    pub price_per_epoch: BigInt,
    pub duration: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectStat {
    pub size: u64,
}

/// The content-addressed object store the deal engine retrieves pieces
/// from and stats proposal data against. `node` supplies the concrete
/// implementation; `chain` only needs this shape, mirroring the
/// `message_pool::Provider` decoupling.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn stat(&self, cid: &Cid) -> Result<ObjectStat, Error>;
    async fn read(&self, cid: &Cid) -> Result<Vec<u8>, Error>;
    async fn put(&self, data: &[u8]) -> Result<Cid, Error>;
}

const OBJECT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T, Error>>) -> Result<T, Error> {
    match tokio::time::timeout(OBJECT_STORE_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::ObjectNotFound),
    }
}

/// A client's request to retrieve a previously-stored piece, and the
/// local file it should be written to.
pub struct RetrievalOrder {
    pub client: Address,
    pub miner: Address,
    pub total: BigInt,
    pub root: Cid,
}

pub struct FileRef {
    pub path: PathBuf,
}

impl FileRef {
    fn partial_path(&self) -> PathBuf {
        let mut partial = self.path.clone().into_os_string();
        partial.push(".partial");
        PathBuf::from(partial)
    }
}

const DEALS_KEY: &str = "deals";

fn load_deals<BS: Store>(store: &BS) -> Result<Vec<DealInfo>, Error> {
    match store.read(DEALS_KEY)? {
        Some(bytes) => Ok(encoding::from_slice(&bytes).map_err(|e| Error::Encoding(e.to_string()))?),
        None => Ok(Vec::new()),
    }
}

/// Storage-deal state machine and settlement. Deal records persist as a
/// single `deals` key, since deal-ID monotonicity must survive restarts
/// and the key-value layout has no dedicated namespace for deals — this
/// manager extends that layout the same way every other manager here
/// persists its domain (see DESIGN.md).
pub struct DealEngine<BS> {
    store: BS,
    accounts: Arc<AccountManager<BS>>,
    private_keys: Arc<PrivateKeyManager<BS>>,
    deals: RwLock<Vec<DealInfo>>,
    in_process: RwLock<Vec<u64>>,
}

impl<BS: Store + Clone> DealEngine<BS> {
    /// `accounts` and `private_keys` are shared with the rest of the
    /// engine (mining, the façade) rather than owned exclusively here, so
    /// every collaborator sees the same cached balances.
    pub fn new(store: BS, accounts: Arc<AccountManager<BS>>, private_keys: Arc<PrivateKeyManager<BS>>) -> Result<Self, Error> {
        let deals = load_deals(&store)?;
        let in_process = deals
            .iter()
            .filter(|d| !d.state.is_terminal_for_tracking())
            .map(|d| d.deal_id)
            .collect();
        Ok(Self {
            store,
            accounts,
            private_keys,
            deals: RwLock::new(deals),
            in_process: RwLock::new(in_process),
        })
    }

    fn persist(&self) -> Result<(), Error> {
        let bytes = encoding::to_vec(&*self.deals.read()).map_err(|e| Error::Encoding(e.to_string()))?;
        self.store.write(DEALS_KEY, bytes)?;
        Ok(())
    }

    pub fn deals(&self) -> Vec<DealInfo> {
        self.deals.read().clone()
    }

    pub fn in_process_deal_ids(&self) -> Vec<u64> {
        self.in_process.read().clone()
    }

    /// Validates the proposal, signs it, registers a new [`DealInfo`],
    /// and unconditionally debits the deal's total price from the client
    /// to the miner. A failed debit is surfaced to the caller rather than
    /// silently ignored.
    pub async fn start_deal<O: ObjectStore>(
        &self,
        objects: &O,
        proposal: StartDealParams,
    ) -> Result<Cid, Error> {
        let key_info = self
            .private_keys
            .get(&proposal.wallet)?
            .ok_or_else(|| Error::UnknownPrivateKey(proposal.wallet.to_string()))?;

        let stat = with_timeout(objects.stat(&proposal.data_root)).await?;

        let signature = sign_with_key_info(&key_info, proposal.data_root.to_bytes().as_slice())
            .map_err(|_| Error::Other("failed to sign deal proposal".into()))?;

        // A simulator shortcut, not a conformant proposal CID: CBOR-hashes
        // the signature's hex encoding rather than the proposal itself.
        let proposal_cid = encoding::cid_from_cbor(
            &encoding::to_vec(&hex::encode(signature.bytes())).map_err(|e| Error::Encoding(e.to_string()))?,
        );

        let deal_id = self.deals.read().len() as u64 + 1;
        let deal = DealInfo {
            deal_id,
            proposal_cid,
            state: StorageDealStatus::Validating,
            provider: proposal.miner.clone(),
            client: proposal.wallet.clone(),
            piece_cid: proposal.data_root,
            size: stat.size,
            price_per_epoch: proposal.price_per_epoch.clone(),
            duration: proposal.duration,
        };

        self.deals.write().push(deal.clone());
        self.in_process.write().push(deal_id);
        self.persist()?;

        let total = proposal.price_per_epoch * BigInt::from(proposal.duration);
        if !self.accounts.transfer_funds(&proposal.wallet, &proposal.miner, &total)? {
            return Err(Error::InsufficientFunds);
        }

        Ok(proposal_cid)
    }

    /// Advances every in-process deal one state, dropping deals from
    /// tracking once they reach `Active`.
    pub fn advance_deals(&self) {
        let ids = self.in_process.read().clone();
        let mut still_in_process = Vec::new();
        {
            let mut deals = self.deals.write();
            for id in ids {
                if let Some(deal) = deals.iter_mut().find(|d| d.deal_id == id) {
                    if let Some(next) = deal.state.next() {
                        deal.state = next;
                    }
                    if !deal.state.is_terminal_for_tracking() {
                        still_in_process.push(id);
                    }
                }
            }
        }
        *self.in_process.write() = still_in_process;
        let _ = self.persist();
    }

    /// Streams a previously-stored object to `file_ref`, then settles
    /// payment from the client to the miner.
    pub async fn retrieve<O: ObjectStore>(&self, objects: &O, order: RetrievalOrder, file_ref: FileRef) -> Result<(), Error> {
        with_timeout(objects.stat(&order.root)).await?;
        let bytes = with_timeout(objects.read(&order.root)).await?;

        let partial = file_ref.partial_path();
        tokio::fs::write(&partial, &bytes).await.map_err(|e| Error::Other(e.to_string()))?;
        tokio::fs::rename(&partial, &file_ref.path).await.map_err(|e| Error::Other(e.to_string()))?;

        if !self.accounts.transfer_funds(&order.client, &order.miner, &order.total)? {
            return Err(Error::InsufficientFunds);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::SignatureType;
    use db::MemoryDB;
    use key_management::KeyInfo;

    struct FakeObjectStore {
        size: u64,
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl ObjectStore for FakeObjectStore {
        async fn stat(&self, _cid: &Cid) -> Result<ObjectStat, Error> {
            Ok(ObjectStat { size: self.size })
        }
        async fn read(&self, _cid: &Cid) -> Result<Vec<u8>, Error> {
            Ok(self.bytes.clone())
        }
        async fn put(&self, data: &[u8]) -> Result<Cid, Error> {
            Ok(encoding::cid_from_cbor(data))
        }
    }

    fn engine() -> (DealEngine<MemoryDB>, Address) {
        let store = MemoryDB::default();
        let accounts = Arc::new(AccountManager::new(store.clone()));
        let private_keys = Arc::new(PrivateKeyManager::new(store.clone()));
        let client = Address::new_id(1);
        let key_info = KeyInfo::new(SignatureType::Secp256k1, vec![7; 32]);
        private_keys.put(&client, &key_info).unwrap();
        (DealEngine::new(store, accounts, private_keys).unwrap(), client)
    }

    fn dummy_cid() -> Cid {
        encoding::cid_from_cbor(b"piece")
    }

    #[tokio::test]
    async fn start_deal_without_known_wallet_errors() {
        let (engine, _) = engine();
        let objects = FakeObjectStore { size: 10, bytes: vec![] };
        let params = StartDealParams {
            wallet: Address::new_id(999),
            miner: Address::new_id(1000),
            data_root: dummy_cid(),
            price_per_epoch: BigInt::from(1u64),
            duration: 1,
        };
        let err = engine.start_deal(&objects, params).await.unwrap_err();
        assert!(matches!(err, Error::UnknownPrivateKey(_)));
    }

    #[tokio::test]
    async fn start_deal_surfaces_insufficient_funds() {
        let (engine, client) = engine();
        let objects = FakeObjectStore { size: 10, bytes: vec![] };
        let params = StartDealParams {
            wallet: client,
            miner: Address::new_id(1000),
            data_root: dummy_cid(),
            price_per_epoch: BigInt::from(1u64),
            duration: 100,
        };
        let err = engine.start_deal(&objects, params).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds));
    }

    #[tokio::test]
    async fn retrieve_streams_object_and_renames_into_place() {
        let (engine, client) = engine();
        let bytes = b"piece-bytes".to_vec();
        let objects = FakeObjectStore { size: bytes.len() as u64, bytes: bytes.clone() };

        let mut path = std::env::temp_dir();
        path.push(format!("chain-deal-retrieve-test-{}", std::process::id()));
        let file_ref = FileRef { path: path.clone() };

        let order = RetrievalOrder {
            client,
            miner: Address::new_id(1000),
            total: BigInt::from(0u64),
            root: dummy_cid(),
        };

        engine.retrieve(&objects, order, file_ref).await.unwrap();
        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written, bytes);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn advance_deals_moves_through_states_and_drops_at_active() {
        let (engine, client) = engine();
        engine
            .deals
            .write()
            .push(DealInfo {
                deal_id: 1,
                proposal_cid: dummy_cid(),
                state: StorageDealStatus::Validating,
                provider: Address::new_id(1000),
                client,
                piece_cid: dummy_cid(),
                size: 10,
                price_per_epoch: BigInt::from(1u64),
                duration: 1,
            });
        *engine.in_process.write() = vec![1];

        engine.advance_deals();
        assert_eq!(engine.deals()[0].state, StorageDealStatus::Staged);
        engine.advance_deals();
        assert_eq!(engine.deals()[0].state, StorageDealStatus::Sealing);
        engine.advance_deals();
        assert_eq!(engine.deals()[0].state, StorageDealStatus::Active);
        assert!(engine.in_process_deal_ids().is_empty());
    }
}
