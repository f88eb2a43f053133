// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use address::Address;
use async_trait::async_trait;
use blocks::{BlockHeader, ElectionProof, Ticket, Tipset};
use chain::{
    Account, AccountManager, BlockMessagesManager, DealEngine, DealInfo, FileRef, ObjectStore,
    PrivateKeyManager, RetrievalOrder, StartDealParams, StorageDealStatus, TipsetManager,
};
use cid::Cid;
use crypto::{Signer, VRFProof};
use db::{MemoryDB, Store};
use encoding::Cbor;
use key_management::{KeyStore, Wallet};
use message::{Message, SignedMessage};
use message_pool::{check_submission, MessagePool, Provider};
use num_bigint::BigInt;
use once_cell::sync::OnceCell;
use rand::RngCore;
use tokio::sync::watch;

use crate::config::Config;
use crate::events::{Event, EventBus};
use crate::mining::{unix_timestamp, MiningEngine};
use crate::objectstore::InMemoryObjectStore;
use crate::prng::DeterministicRng;
use crate::Error;

const GENESIS_ACCOUNT_COUNT: usize = 5;
const GENESIS_BALANCE_ATTOFIL: u64 = 1_000_000_000;
const OBJECT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T, chain::Error>>) -> Result<T, Error> {
    match tokio::time::timeout(OBJECT_STORE_TIMEOUT, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Chain(chain::Error::ObjectNotFound)),
    }
}

/// Advisory parameters for a [`Simulator::push`] call. Empty for now: the
/// simulator has no gas market to negotiate against, so there is nothing
/// for a caller to override beyond what `Message` itself already carries.
#[derive(Clone, Debug, Default)]
pub struct MessageSendSpec {
    pub max_fee: Option<BigInt>,
}

/// A priced offer to retrieve a previously-stored piece. Price is a flat
/// function of size; the simulator has no real retrieval market.
#[derive(Clone, Debug)]
pub struct QueryOffer {
    pub root: Cid,
    pub size: u64,
    pub min_price: BigInt,
    pub miner: Address,
}

struct LedgerProvider {
    accounts: Arc<AccountManager<MemoryDB>>,
}

#[async_trait]
impl Provider for LedgerProvider {
    async fn account_nonce(&self, addr: &Address) -> Result<u64, message_pool::Error> {
        self.accounts.nonce(addr).map_err(|e| message_pool::Error::Other(e.to_string()))
    }

    async fn account_balance(&self, addr: &Address) -> Result<BigInt, message_pool::Error> {
        self.accounts.balance(addr).map_err(|e| message_pool::Error::Other(e.to_string()))
    }
}

/// Everything that only exists once [`Simulator::init`] has run: the
/// managers, the wallet holding genesis key material, and the scheduled
/// mining timer (if any). Kept separate from [`Simulator`] itself so
/// `new()` can return an inert, not-yet-wired value the way the rest of
/// the workspace's two-phase constructors do.
struct Inner {
    wallet: Wallet,
    accounts: Arc<AccountManager<MemoryDB>>,
    tipsets: Arc<TipsetManager<MemoryDB>>,
    #[allow(dead_code)]
    block_messages: Arc<BlockMessagesManager<MemoryDB>>,
    #[allow(dead_code)]
    private_keys: Arc<PrivateKeyManager<MemoryDB>>,
    deals: Arc<DealEngine<MemoryDB>>,
    pool: Arc<MessagePool<LedgerProvider>>,
    mining: Arc<MiningEngine<MemoryDB, LedgerProvider>>,
    timer_handle: Option<tokio::task::JoinHandle<()>>,
}

/// Façade over every collaborator crate, gating all operations on a
/// two-phase readiness lifecycle: [`Simulator::new`] returns immediately
/// with nothing wired up, [`Simulator::init`] does the (here, synchronous
/// but still explicitly staged) work of wiring managers, seeding genesis
/// state, and arming the mining timer before flipping ready.
pub struct Simulator {
    config: Config,
    store: MemoryDB,
    objects: Arc<InMemoryObjectStore>,
    events: EventBus,
    ready_tx: watch::Sender<bool>,
    inner: OnceCell<Inner>,
}

impl Simulator {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, MemoryDB::default())
    }

    /// Builds over a caller-supplied store, letting a fresh [`Simulator`]
    /// pick up the ledger and chain state a previous, now-dropped instance
    /// left behind in the same (`Arc`-backed) [`MemoryDB`] — the only way
    /// this in-process simulator can model a node restart.
    pub fn with_store(config: Config, store: MemoryDB) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            config,
            store,
            objects: Arc::new(InMemoryObjectStore::new()),
            events: EventBus::new(),
            ready_tx,
            inner: OnceCell::new(),
        }
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn objects(&self) -> Arc<InMemoryObjectStore> {
        self.objects.clone()
    }

    /// Handle to the backing store, shareable with [`Simulator::with_store`]
    /// to simulate a restart against the same chain state.
    pub fn store_handle(&self) -> MemoryDB {
        self.store.clone()
    }

    /// Wires every manager over the shared store, seeds genesis accounts
    /// and the genesis tipset if none exist yet, arms the scheduled
    /// mining timer, and flips readiness. Idempotent: a second call is a
    /// no-op.
    pub async fn init(&self) -> Result<(), Error> {
        if self.inner.get().is_some() {
            return Ok(());
        }

        let accounts = Arc::new(AccountManager::new(self.store.clone()));
        let tipsets = Arc::new(TipsetManager::new(self.store.clone())?);
        let block_messages = Arc::new(BlockMessagesManager::new(self.store.clone()));
        let private_keys = Arc::new(PrivateKeyManager::new(self.store.clone()));
        let deals = Arc::new(DealEngine::new(self.store.clone(), accounts.clone(), private_keys.clone())?);

        let mut wallet = Wallet::new(KeyStore::new());
        self.restore_genesis_wallet_keys(&mut wallet)?;
        if tipsets.genesis_tipset()?.is_none() {
            self.seed_genesis(&accounts, &private_keys, &tipsets, &mut wallet)?;
        }

        let provider = Arc::new(LedgerProvider { accounts: accounts.clone() });
        let pool = Arc::new(MessagePool::new(provider));
        let mining = Arc::new(MiningEngine::new(
            accounts.clone(),
            tipsets.clone(),
            block_messages.clone(),
            deals.clone(),
            pool.clone(),
            self.events.clone(),
            self.config.miner.clone(),
        ));

        let timer_handle = if !self.config.instamine && self.config.block_time_ms > 0 {
            let mining = mining.clone();
            let period = Duration::from_millis(self.config.block_time_ms);
            Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    ticker.tick().await;
                    if let Err(e) = mining.mine_tipset(1).await {
                        log::warn!("scheduled mining failed: {e}");
                    }
                }
            }))
        } else {
            None
        };

        let _ = self.inner.set(Inner {
            wallet,
            accounts,
            tipsets,
            block_messages,
            private_keys,
            deals,
            pool,
            mining,
            timer_handle,
        });

        let _ = self.ready_tx.send(true);
        self.events.emit(Event::Ready);
        Ok(())
    }

    /// Regenerates and imports the genesis wallet keys deterministically
    /// from `config.wallet_seed`, regardless of whether genesis state
    /// itself has already been seeded. A [`Simulator`] built with
    /// [`Simulator::with_store`] over another instance's store therefore
    /// still gets signing keys for the accounts that instance created,
    /// without re-crediting balances or re-deriving the genesis tipset.
    fn restore_genesis_wallet_keys(&self, wallet: &mut Wallet) -> Result<(), Error> {
        let mut rng = DeterministicRng::new(self.config.wallet_seed);
        for _ in 0..GENESIS_ACCOUNT_COUNT {
            wallet.generate_key_with(crypto::SignatureType::Secp256k1, &mut rng)?;
        }
        Ok(())
    }

    /// Persists the already wallet-resident genesis accounts' private keys,
    /// credits each with a fixed starting balance, and commits a genesis
    /// tipset at height 0 whose ticket is derived from the seed. The
    /// simulator's genesis CID is therefore stable across restarts for a
    /// given seed, but is not pinned to any externally-specified value:
    /// content addressing ties the CID to this crate's own CBOR encoding,
    /// which a different implementation's encoding cannot be made to
    /// match bit-for-bit.
    fn seed_genesis(
        &self,
        accounts: &AccountManager<MemoryDB>,
        private_keys: &PrivateKeyManager<MemoryDB>,
        tipsets: &TipsetManager<MemoryDB>,
        wallet: &mut Wallet,
    ) -> Result<(), Error> {
        for addr in wallet.list_addrs() {
            let key_info = wallet.export(&addr)?;
            private_keys.put(&addr, &key_info)?;
            accounts.credit(&addr, &BigInt::from(GENESIS_BALANCE_ATTOFIL))?;
        }

        // A seed distinct from the wallet-key stream keeps ticket
        // derivation independent of how many keys genesis generates.
        let mut rng = DeterministicRng::new(self.config.wallet_seed.wrapping_add(1));
        let mut vrf_bytes = [0u8; 32];
        rng.fill_bytes(&mut vrf_bytes);
        let header = BlockHeader::builder()
            .miner_address(self.config.miner.clone())
            .height(0)
            .parent_weight(BigInt::from(0u64))
            .ticket(Ticket::new(VRFProof::new(vrf_bytes.to_vec())))
            .election_proof(ElectionProof::default())
            .timestamp(unix_timestamp())
            .build()
            .map_err(|e| Error::Other(e.to_string()))?
            .with_cached_cid();

        tipsets.blocks().put(&header)?;
        let genesis = Tipset::new(vec![header])?;
        tipsets.put_tipset(&genesis)?;
        Ok(())
    }

    /// Blocks until [`Simulator::init`] has flipped readiness.
    pub async fn wait_for_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    fn inner(&self) -> Result<&Inner, Error> {
        self.inner.get().ok_or(Error::NotReady)
    }

    /// Acquires the mining-lock, then the pool-lock, and never releases
    /// either. Subsequent calls to any mining or submission operation
    /// block forever; this method itself cannot fail.
    pub async fn stop(&self) {
        self.wait_for_ready().await;
        if let Ok(inner) = self.inner() {
            if let Some(handle) = &inner.timer_handle {
                handle.abort();
            }
            inner.mining.halt().await;
            inner.pool.halt().await;
        }
        log::info!("simulator stopped");
    }

    /// Assigns a nonce, signs with the wallet key behind `message.from`,
    /// and admits the message to the pool — all under one held pool-lock.
    /// Triggers an immediate mining pass when `instamine` is set, after
    /// releasing the pool-lock so the miner can acquire it to drain the
    /// batch.
    pub async fn push(&self, mut message: Message, _spec: MessageSendSpec) -> Result<SignedMessage, Error> {
        self.wait_for_ready().await;
        let inner = self.inner()?;

        check_submission(&message)?;

        let mut guard = inner.pool.lock().await;
        let nonce = inner.pool.project_nonce(&guard[..], &message.from).await?;
        message.nonce = nonce;

        let bytes = message.marshal_cbor()?;
        let signature = inner.wallet.sign_bytes(&bytes, &message.from)?;
        let signed = SignedMessage::new_unchecked(message, signature);

        inner.pool.insert_locked(&mut guard, signed.clone()).await?;
        drop(guard);

        if self.config.instamine {
            inner.mining.mine_tipset(1).await?;
        }

        Ok(signed)
    }

    /// Admits an already-signed message, optionally acquiring the
    /// pool-lock itself (`acquire_lock = true`) or assuming the caller
    /// already holds it via a prior [`Simulator::push`]-style sequence.
    pub async fn push_signed(&self, msg: SignedMessage, acquire_lock: bool) -> Result<Cid, Error> {
        self.wait_for_ready().await;
        let inner = self.inner()?;

        let cid = if acquire_lock {
            inner.pool.push_signed(msg).await?
        } else {
            let mut guard = inner.pool.lock().await;
            inner.pool.insert_locked(&mut guard, msg).await?
        };

        if self.config.instamine {
            inner.mining.mine_tipset(1).await?;
        }

        Ok(cid)
    }

    pub async fn mine_tipset(&self, n: u64) -> Result<Tipset, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.mining.mine_tipset(n).await?)
    }

    /// Starts a storage deal against the shared object store, then, under
    /// `instamine`, mines tipsets until the deal reaches `Active`.
    pub async fn start_deal(&self, proposal: StartDealParams) -> Result<Cid, Error> {
        self.wait_for_ready().await;
        let inner = self.inner()?;

        let cid = inner.deals.start_deal(&*self.objects, proposal).await?;

        if self.config.instamine {
            loop {
                let active = inner
                    .deals
                    .deals()
                    .iter()
                    .any(|d| d.proposal_cid == cid && d.state == StorageDealStatus::Active);
                if active {
                    break;
                }
                inner.mining.mine_tipset(1).await?;
            }
        }

        Ok(cid)
    }

    pub async fn retrieve(&self, order: RetrievalOrder, file_ref: FileRef) -> Result<(), Error> {
        self.wait_for_ready().await;
        self.inner()?.deals.retrieve(&*self.objects, order, file_ref).await?;
        Ok(())
    }

    /// Every deal registered so far, regardless of state. Not part of the
    /// façade's listed operations, but the only way a caller can observe
    /// deal progress without re-deriving it from mined tipset counts.
    pub async fn deals(&self) -> Result<Vec<DealInfo>, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.deals.deals())
    }

    /// Current balance and nonce for `addr` (`getAccount`). Zero-balance,
    /// zero-nonce for any address never credited or debited.
    pub async fn account(&self, addr: &Address) -> Result<Account, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.accounts.get_account(addr)?)
    }

    /// Addresses seeded at genesis with a starting balance and a wallet
    /// key the simulator can sign with.
    pub async fn genesis_accounts(&self) -> Result<Vec<Address>, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.wallet.list_addrs())
    }

    /// Stores raw piece bytes directly with the object store, returning
    /// its content identifier. Not part of the deal lifecycle itself, but
    /// the only way a caller can get data into the store ahead of
    /// `start_deal`.
    pub async fn put_object(&self, data: &[u8]) -> Result<Cid, Error> {
        self.wait_for_ready().await;
        Ok(with_timeout(self.objects.put(data)).await?)
    }

    pub async fn create_query_offer(&self, root: Cid) -> Result<QueryOffer, Error> {
        self.wait_for_ready().await;
        let stat = with_timeout(self.objects.stat(&root)).await?;
        Ok(QueryOffer {
            root,
            size: stat.size,
            min_price: BigInt::from(stat.size) * BigInt::from(2u64),
            miner: self.config.miner.clone(),
        })
    }

    pub async fn has_local(&self, cid: &Cid) -> bool {
        self.wait_for_ready().await;
        with_timeout(self.objects.stat(cid)).await.is_ok()
    }

    pub async fn latest_tipset(&self) -> Result<Option<Tipset>, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.tipsets.latest_tipset()?)
    }

    pub async fn genesis_tipset(&self) -> Result<Option<Tipset>, Error> {
        self.wait_for_ready().await;
        Ok(self.inner()?.tipsets.genesis_tipset()?)
    }
}
