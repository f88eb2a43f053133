// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use address::Address;
use cid::Cid;
use log::warn;
use message::SignedMessage;
use num_bigint::BigInt;
use tokio::sync::{Mutex, MutexGuard};

use crate::provider::Provider;
use crate::validator::check_method_and_protocol;
use crate::Error;

/// In-memory queue of validated signed messages awaiting inclusion, guarded
/// by a single non-reentrant pool-lock. A plain `Vec` suffices: the mining
/// engine always drains the whole thing in submission order, and
/// per-sender projection only ever needs a linear scan.
pub struct MessagePool<P> {
    provider: Arc<P>,
    pending: Mutex<Vec<SignedMessage>>,
}

impl<P: Provider> MessagePool<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Acquires the pool-lock. Exposed so that callers needing to assign a
    /// nonce, sign, and insert as one atomic step (the engine's `push`
    /// operation) can hold the lock across all three instead of
    /// reacquiring it for each.
    pub async fn lock(&self) -> MutexGuard<'_, Vec<SignedMessage>> {
        self.pending.lock().await
    }

    /// The nonce that would be assigned to a new message from `from` right
    /// now, given the already-held pool snapshot.
    pub async fn project_nonce(&self, pending: &[SignedMessage], from: &Address) -> Result<u64, Error> {
        let committed = self.provider.account_nonce(from).await?;
        Ok(project_nonce_locked(pending, from, committed))
    }

    /// Total funds `from` would owe across the pool plus one prospective
    /// additional message.
    fn required_funds_locked(pending: &[SignedMessage], from: &Address, extra: &BigInt) -> BigInt {
        let mut total = extra.clone();
        for m in pending.iter().filter(|m| m.from() == from) {
            total += m.required_funds();
        }
        total
    }

    /// Inserts an already-signed, already-nonce-correct message while the
    /// caller holds the pool-lock (the `acquireLock = false` path of
    /// `pushSigned`). Re-validates funds and rejects duplicate nonces, since
    /// the lock may have been reacquired since the nonce was computed.
    pub async fn insert_locked(
        &self,
        guard: &mut MutexGuard<'_, Vec<SignedMessage>>,
        msg: SignedMessage,
    ) -> Result<Cid, Error> {
        check_method_and_protocol(msg.message())?;
        msg.verify_signature().map_err(|_| Error::InvalidSignature)?;

        if guard.iter().any(|m| m.from() == msg.from() && m.nonce() == msg.nonce()) {
            return Err(Error::DuplicateSequence);
        }

        let balance = self.provider.account_balance(msg.from()).await?;
        let total = Self::required_funds_locked(guard, msg.from(), &msg.required_funds());
        if balance < total {
            return Err(Error::InsufficientFunds);
        }

        let cid = msg.cid()?;
        guard.push(msg);
        Ok(cid)
    }

    /// `pushSigned(msg, acquireLock = true)`: validates and inserts a
    /// pre-signed message, acquiring the pool-lock itself.
    pub async fn push_signed(&self, msg: SignedMessage) -> Result<Cid, Error> {
        let mut guard = self.pending.lock().await;
        self.insert_locked(&mut guard, msg).await
    }

    /// `drainAll()`: atomically empties the pool, returning its contents in
    /// submission order for the miner to apply.
    pub async fn drain_all(&self) -> Vec<SignedMessage> {
        let mut guard = self.pending.lock().await;
        std::mem::take(&mut *guard)
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Acquires the pool-lock and leaks the guard, permanently blocking
    /// every future submission. Used by shutdown, which never resumes.
    pub async fn halt(&self) {
        let guard = self.pending.lock().await;
        std::mem::forget(guard);
    }
}

fn project_nonce_locked(pending: &[SignedMessage], from: &Address, committed: u64) -> u64 {
    match pending.iter().filter(|m| m.from() == from).map(SignedMessage::nonce).max() {
        Some(max) => committed.max(max + 1),
        None => committed,
    }
}

/// Logs and drops a message that failed to apply during mining rather than
/// aborting the batch.
pub fn log_skipped(msg: &SignedMessage, reason: &str) {
    warn!(
        "skipping message {:?} from {}: {reason}",
        msg.cid().ok(),
        msg.from()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crypto::Signature;
    use encoding::Cbor;
    use message::Message;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    struct TestProvider {
        nonces: TokioMutex<HashMap<Address, u64>>,
        balances: TokioMutex<HashMap<Address, BigInt>>,
    }

    #[async_trait]
    impl Provider for TestProvider {
        async fn account_nonce(&self, addr: &Address) -> Result<u64, Error> {
            Ok(*self.nonces.lock().await.get(addr).unwrap_or(&0))
        }

        async fn account_balance(&self, addr: &Address) -> Result<BigInt, Error> {
            Ok(self
                .balances
                .lock()
                .await
                .get(addr)
                .cloned()
                .unwrap_or_default())
        }
    }

    /// A real secp256k1 keypair and its derived address, so messages built
    /// from it pass `verify_signature` instead of just `unwrap`-ing past it.
    struct Sender {
        private_key: Vec<u8>,
        address: Address,
    }

    fn sender_keypair(seed: u64) -> Sender {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let private_key = crypto::generate_secp256k1_private_key(&mut rng);
        let public_key = crypto::secp256k1_public_key(&private_key).unwrap();
        Sender {
            private_key,
            address: Address::new_secp256k1(public_key),
        }
    }

    fn signed(sender: &Sender, to: Address, nonce: u64, value: u64) -> SignedMessage {
        let msg = Message {
            from: sender.address.clone(),
            to,
            nonce,
            value: BigInt::from(value),
            method: 0,
            gas_limit: 1,
            gas_fee_cap: BigInt::from(1u64),
            gas_premium: BigInt::from(0u64),
        };
        let hash = crypto::blake2b_256(&msg.marshal_cbor().unwrap());
        let sig_bytes = crypto::sign_secp256k1(&sender.private_key, &hash).unwrap();
        SignedMessage::new_unchecked(msg, Signature::new_secp256k1(sig_bytes))
    }

    fn recipient() -> Address {
        Address::new_bls(vec![8; 48])
    }

    #[tokio::test]
    async fn nonce_projection_chains_across_pending_messages() {
        let sender = sender_keypair(1);
        let mut balances = HashMap::new();
        balances.insert(sender.address.clone(), BigInt::from(1_000u64));
        let provider = Arc::new(TestProvider {
            nonces: TokioMutex::new(HashMap::new()),
            balances: TokioMutex::new(balances),
        });
        let pool = MessagePool::new(provider);

        let first = pool.project_nonce(&[], &sender.address).await.unwrap();
        assert_eq!(first, 0);
        pool.push_signed(signed(&sender, recipient(), 0, 1)).await.unwrap();

        let pending = pool.lock().await.clone();
        let second = pool.project_nonce(&pending, &sender.address).await.unwrap();
        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn insufficient_funds_is_rejected_at_submission() {
        let sender = sender_keypair(2);
        let mut balances = HashMap::new();
        balances.insert(sender.address.clone(), BigInt::from(5u64));
        let provider = Arc::new(TestProvider {
            nonces: TokioMutex::new(HashMap::new()),
            balances: TokioMutex::new(balances),
        });
        let pool = MessagePool::new(provider);

        let err = pool
            .push_signed(signed(&sender, recipient(), 0, 10))
            .await
            .unwrap_err();
        assert_eq!(err, Error::InsufficientFunds);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_nonce_rejected() {
        let sender = sender_keypair(3);
        let mut balances = HashMap::new();
        balances.insert(sender.address.clone(), BigInt::from(1_000u64));
        let provider = Arc::new(TestProvider {
            nonces: TokioMutex::new(HashMap::new()),
            balances: TokioMutex::new(balances),
        });
        let pool = MessagePool::new(provider);
        pool.push_signed(signed(&sender, recipient(), 0, 1)).await.unwrap();
        let err = pool
            .push_signed(signed(&sender, recipient(), 0, 1))
            .await
            .unwrap_err();
        assert_eq!(err, Error::DuplicateSequence);
    }

    #[tokio::test]
    async fn drain_all_empties_pool_in_order() {
        let sender = sender_keypair(4);
        let mut balances = HashMap::new();
        balances.insert(sender.address.clone(), BigInt::from(1_000u64));
        let provider = Arc::new(TestProvider {
            nonces: TokioMutex::new(HashMap::new()),
            balances: TokioMutex::new(balances),
        });
        let pool = MessagePool::new(provider);
        pool.push_signed(signed(&sender, recipient(), 0, 1)).await.unwrap();
        pool.push_signed(signed(&sender, recipient(), 1, 1)).await.unwrap();

        let drained = pool.drain_all().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].nonce(), 0);
        assert_eq!(drained[1].nonce(), 1);
        assert!(pool.is_empty().await);
    }
}
