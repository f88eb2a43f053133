// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use address::Address;
use blocks::{BlockHeader, ElectionProof, Ticket, Tipset, TipsetKeys};
use chain::{AccountManager, BlockMessagesManager, DealEngine, TipsetManager};
use crypto::VRFProof;
use db::Store;
use message_pool::{log_skipped, MessagePool, Provider};
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::events::{Event, EventBus};
use crate::Error;

/// The well-known sink every base fee is burned to.
pub static BURNT_FUNDS_ADDRESS: Lazy<Address> = Lazy::new(|| Address::new_id(99));

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Seals tipsets: assembles block headers, applies a drained pool batch
/// to the account ledger in submission order, and commits the result.
/// Owns the mining-lock; callers never need to coordinate it themselves.
pub struct MiningEngine<BS, P> {
    accounts: Arc<AccountManager<BS>>,
    tipsets: Arc<TipsetManager<BS>>,
    block_messages: Arc<BlockMessagesManager<BS>>,
    deals: Arc<DealEngine<BS>>,
    pool: Arc<MessagePool<P>>,
    events: EventBus,
    miner: Address,
    lock: Mutex<()>,
}

impl<BS, P> MiningEngine<BS, P>
where
    BS: Store + Clone,
    P: Provider,
{
    pub fn new(
        accounts: Arc<AccountManager<BS>>,
        tipsets: Arc<TipsetManager<BS>>,
        block_messages: Arc<BlockMessagesManager<BS>>,
        deals: Arc<DealEngine<BS>>,
        pool: Arc<MessagePool<P>>,
        events: EventBus,
        miner: Address,
    ) -> Self {
        Self {
            accounts,
            tipsets,
            block_messages,
            deals,
            pool,
            events,
            miner,
            lock: Mutex::new(()),
        }
    }

    /// Seals one tipset containing `n` sibling blocks. Requires a prior
    /// tipset (genesis, at minimum) to already be committed.
    pub async fn mine_tipset(&self, n: u64) -> Result<Tipset, Error> {
        let _guard = self.lock.lock().await;

        let batch = self.pool.drain_all().await;

        let latest = self
            .tipsets
            .latest_tipset()?
            .ok_or_else(|| Error::Other("no tipset to build on; genesis missing".into()))?;
        // Naive single-parent linkage: only the tipset's first block (by
        // ticket order) becomes the parent, even when the tipset has
        // multiple sibling blocks.
        let first_block = latest.blocks().first().expect("Tipset::new guarantees non-empty");
        let new_height = latest.epoch() + 1;
        let parent_weight = BigInt::from(first_block.election_proof().win_count) + first_block.parent_weight().clone();
        let parents = TipsetKeys::new(vec![latest.cids()[0].clone()]);

        let mut headers = Vec::with_capacity(n.max(1) as usize);
        for i in 0..n.max(1) {
            let ticket_seed = format!("{new_height}-{i}");
            let vrfproof = VRFProof::new(encoding::blake2b_256(ticket_seed.as_bytes()).to_vec());
            let header = BlockHeader::builder()
                .parents(parents.clone())
                .parent_weight(parent_weight.clone())
                .height(new_height)
                .miner_address(self.miner.clone())
                .ticket(Ticket::new(vrfproof))
                .election_proof(ElectionProof::default())
                .timestamp(unix_timestamp())
                .build()
                .map_err(|e| Error::Other(e.to_string()))?
                .with_cached_cid();
            headers.push(header);
        }

        let tipset = Tipset::new(headers)?;
        for header in tipset.blocks() {
            self.tipsets.blocks().put(header)?;
        }
        let first_block_cid = tipset.min_ticket_block().cid()?;

        let mut successful = Vec::with_capacity(batch.len());
        for msg in batch {
            let fee = msg.miner_fee();
            if !self.accounts.transfer_funds(msg.from(), &BURNT_FUNDS_ADDRESS, &fee)? {
                log_skipped(&msg, "insufficient funds for base fee");
                continue;
            }
            if !self.accounts.transfer_funds(msg.from(), &self.miner, &fee)? {
                log_skipped(&msg, "insufficient funds for miner reward");
                continue;
            }
            if !self.accounts.transfer_funds(msg.from(), msg.to(), msg.value())? {
                log_skipped(&msg, "insufficient funds for value transfer");
                continue;
            }
            self.accounts.increment_nonce(msg.from())?;
            successful.push(msg);
        }

        for msg in &successful {
            self.block_messages.signed_messages().put(msg)?;
        }
        self.tipsets
            .commit_with_block_messages(&tipset, &first_block_cid, &successful)?;

        self.deals.advance_deals();
        self.events.emit(Event::Tipset(tipset.clone()));

        Ok(tipset)
    }

    /// Acquires the mining-lock and leaks the guard, permanently blocking
    /// every future `mine_tipset` call. Used by shutdown, which never
    /// resumes.
    pub async fn halt(&self) {
        let guard = self.lock.lock().await;
        std::mem::forget(guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use address::Address as Addr;
    use chain::PrivateKeyManager;
    use crypto::Signature;
    use db::MemoryDB;
    use encoding::Cbor;
    use message::{Message, SignedMessage};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct StaticProvider {
        accounts: Arc<AccountManager<MemoryDB>>,
    }

    #[async_trait::async_trait]
    impl Provider for StaticProvider {
        async fn account_nonce(&self, addr: &Addr) -> Result<u64, message_pool::Error> {
            Ok(self.accounts.nonce(addr).unwrap_or(0))
        }
        async fn account_balance(&self, addr: &Addr) -> Result<BigInt, message_pool::Error> {
            Ok(self.accounts.balance(addr).unwrap_or_default())
        }
    }

    fn genesis_header(miner: u64) -> BlockHeader {
        BlockHeader::builder()
            .miner_address(Addr::new_id(miner))
            .height(0)
            .build()
            .unwrap()
    }

    fn setup() -> (MiningEngine<MemoryDB, StaticProvider>, Arc<AccountManager<MemoryDB>>) {
        let store = MemoryDB::default();
        let accounts = Arc::new(AccountManager::new(store.clone()));
        let tipsets = Arc::new(TipsetManager::new(store.clone()).unwrap());
        let block_messages = Arc::new(BlockMessagesManager::new(store.clone()));
        let private_keys = Arc::new(PrivateKeyManager::new(store.clone()));
        let deals = Arc::new(DealEngine::new(store, accounts.clone(), private_keys).unwrap());

        let genesis = Tipset::new(vec![genesis_header(1000)]).unwrap();
        tipsets.blocks().put(&genesis.blocks()[0]).unwrap();
        tipsets.put_tipset(&genesis).unwrap();

        let provider = Arc::new(StaticProvider { accounts: accounts.clone() });
        let pool = Arc::new(MessagePool::new(provider));

        let engine = MiningEngine::new(
            accounts.clone(),
            tipsets,
            block_messages,
            deals,
            pool,
            EventBus::new(),
            Addr::new_id(1000),
        );
        (engine, accounts)
    }

    /// A real secp256k1 keypair and its derived address, so messages signed
    /// with it pass `verify_signature` inside the pool instead of just
    /// `unwrap`-ing past a placeholder signature.
    struct Sender {
        private_key: Vec<u8>,
        address: Addr,
    }

    fn sender_keypair(seed: u64) -> Sender {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let private_key = crypto::generate_secp256k1_private_key(&mut rng);
        let public_key = crypto::secp256k1_public_key(&private_key).unwrap();
        Sender {
            private_key,
            address: Addr::new_secp256k1(public_key),
        }
    }

    fn signed(sender: &Sender, to: Addr, nonce: u64, value: u64) -> SignedMessage {
        let msg = Message {
            from: sender.address.clone(),
            to,
            nonce,
            value: BigInt::from(value),
            method: 0,
            gas_limit: 1,
            gas_fee_cap: BigInt::from(1u64),
            gas_premium: BigInt::from(1u64),
        };
        let hash = crypto::blake2b_256(&msg.marshal_cbor().unwrap());
        let sig_bytes = crypto::sign_secp256k1(&sender.private_key, &hash).unwrap();
        SignedMessage::new_unchecked(msg, Signature::new_secp256k1(sig_bytes))
    }

    #[tokio::test]
    async fn empty_pool_still_advances_height() {
        let (engine, _) = setup();
        let tipset = engine.mine_tipset(1).await.unwrap();
        assert_eq!(tipset.epoch(), 1);
    }

    #[tokio::test]
    async fn happy_path_transfer_debits_value_and_fees() {
        let (engine, accounts) = setup();
        let a = sender_keypair(101);
        let b = Addr::new_secp256k1(vec![2; 20]);
        accounts.credit(&a.address, &BigInt::from(100u64)).unwrap();

        engine.pool.push_signed(signed(&a, b.clone(), 0, 10)).await.unwrap();
        let tipset = engine.mine_tipset(1).await.unwrap();

        assert_eq!(tipset.epoch(), 1);
        // value (10) + base fee (1) + miner reward (1) = 12 debited from A.
        assert_eq!(accounts.balance(&a.address).unwrap(), BigInt::from(88u64));
        assert_eq!(accounts.balance(&b).unwrap(), BigInt::from(10u64));
        assert_eq!(accounts.balance(&Addr::new_id(1000)).unwrap(), BigInt::from(1u64));
        assert_eq!(accounts.balance(&BURNT_FUNDS_ADDRESS).unwrap(), BigInt::from(1u64));
        assert_eq!(accounts.nonce(&a.address).unwrap(), 1);
    }

    #[tokio::test]
    async fn message_skipped_mid_apply_leaves_already_debited_fees() {
        let (engine, accounts) = setup();
        let a = sender_keypair(102);
        let b = Addr::new_secp256k1(vec![4; 20]);
        let c = Addr::new_secp256k1(vec![5; 20]);
        accounts.credit(&a.address, &BigInt::from(10u64)).unwrap();

        engine.pool.push_signed(signed(&a, b.clone(), 0, 7)).await.unwrap();

        // An externally-applied debit between submission and mining (e.g.
        // a concurrent transfer) leaves the pre-admitted message's
        // principal transfer unaffordable by the time mining applies it.
        accounts.transfer_funds(&a.address, &c, &BigInt::from(5u64)).unwrap();

        let tipset = engine.mine_tipset(1).await.unwrap();
        assert_eq!(tipset.epoch(), 1);

        // Base fee and miner reward (1 each) already left A's account
        // before the principal transfer failed; the message is not
        // reversed, and A's nonce is not incremented since the message
        // never made it into `successful`.
        assert_eq!(accounts.balance(&a.address).unwrap(), BigInt::from(3u64));
        assert_eq!(accounts.balance(&b).unwrap(), BigInt::from(0u64));
        assert_eq!(accounts.nonce(&a.address).unwrap(), 0);
    }
}
