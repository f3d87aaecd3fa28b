// crates/hyperchain-consensus/src/coordinator.rs
//
// Block production and incoming block verification.
//
// One production cycle:
//   1. select a producer (no active validator: skip the cycle);
//   2. drain up to `batch_size` transactions from the pool;
//   3. route the batch to a shard;
//   4. build the block over the shard's current tips;
//   5. sign it with every configured algorithm;
//   6. commit it to the shard;
//   7. broadcast, record the outcome, reward the producer.
//
// Steps 1 to 6 either succeed or return the batch to the front of the pool.
// Step 7 runs after the commit in separate critical sections: a failure there
// is logged and never rolls the block back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use hyperchain_core::{
    BlockHash, ChainError, Clock, CryptoProvider, KeyStore, TransactionSource,
};
use hyperchain_economics::{block_reward, SignaturePenalties};
use hyperchain_store::{BroadcastSink, DagBlock, DagShard, ShardAssigner, ShardStats};

use crate::registry::ValidatorRegistry;

/// Transactions per block when not configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Tunables for block production.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub batch_size: usize,
    /// Number of DAG shards. Must be at least 1.
    pub sharding_factor: u32,
    /// Every block is signed, and every incoming block verified, under each
    /// of these algorithms.
    pub signature_algorithms: Vec<String>,
    pub penalties: SignaturePenalties,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sharding_factor: 4,
            signature_algorithms: vec![hyperchain_core::crypto::ED25519.to_string()],
            penalties: SignaturePenalties::default(),
        }
    }
}

/// Summary of a committed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReceipt {
    pub block_hash: BlockHash,
    pub shard_id: u32,
    pub producer: String,
    pub transaction_count: usize,
    /// Seconds spent handing the block to the broadcast sink.
    pub propagation_time: f64,
    pub reward: u64,
}

pub struct ConsensusCoordinator {
    config: CoordinatorConfig,
    registry: Arc<ValidatorRegistry>,
    shards: Vec<Arc<DagShard>>,
    assigner: ShardAssigner,
    pool: Arc<dyn TransactionSource>,
    crypto: Arc<dyn CryptoProvider>,
    keys: Arc<KeyStore>,
    broadcaster: Arc<dyn BroadcastSink>,
    clock: Arc<dyn Clock>,
    ticks: AtomicU64,
}

impl std::fmt::Debug for ConsensusCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusCoordinator")
            .field("config", &self.config)
            .field("shards", &self.shards.len())
            .field("ticks", &self.ticks.load(Ordering::Relaxed))
            .finish()
    }
}

impl ConsensusCoordinator {
    /// Build a coordinator with `config.sharding_factor` empty shards.
    ///
    /// # Panics
    /// Panics if `config.sharding_factor` is 0.
    pub fn new(
        config: CoordinatorConfig,
        registry: Arc<ValidatorRegistry>,
        pool: Arc<dyn TransactionSource>,
        crypto: Arc<dyn CryptoProvider>,
        keys: Arc<KeyStore>,
        broadcaster: Arc<dyn BroadcastSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let assigner = ShardAssigner::new(config.sharding_factor);
        let shards = (0..config.sharding_factor)
            .map(|id| Arc::new(DagShard::new(id)))
            .collect();
        Self {
            config,
            registry,
            shards,
            assigner,
            pool,
            crypto,
            keys,
            broadcaster,
            clock,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<dyn TransactionSource> {
        &self.pool
    }

    pub fn shards(&self) -> &[Arc<DagShard>] {
        &self.shards
    }

    pub fn shard(&self, shard_id: u32) -> Option<&Arc<DagShard>> {
        self.shards.get(shard_id as usize)
    }

    pub fn shard_stats(&self) -> Vec<ShardStats> {
        self.shards.iter().map(|s| s.stats()).collect()
    }

    /// Number of production cycles started so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run one production cycle.
    ///
    /// Returns `Ok(None)` when no validator is active; the pool is left
    /// untouched in that case.
    ///
    /// # Errors
    /// `SigningFailure` if a configured algorithm has no local key or the
    /// provider fails, or the shard's rejection (`UnknownParent`,
    /// `DuplicateBlock`). In every error case the batch goes back to the
    /// front of the pool.
    pub fn produce_block(&self) -> Result<Option<BlockReceipt>, ChainError> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);

        let Some(producer) = self.registry.select() else {
            tracing::debug!("No active validator, skipping block production");
            return Ok(None);
        };

        let batch = self.pool.get_batch(self.config.batch_size);
        let shard_id = self.assigner.route(&batch, tick);
        // The assigner only yields ids below the shard count.
        let shard = self.shards[shard_id as usize].clone();

        let mut block = DagBlock::new(
            shard_id,
            batch.clone(),
            producer.address.clone(),
            shard.tips(),
            self.clock.now(),
        );

        if let Err(e) = self.sign(&mut block, &producer.address) {
            self.pool.requeue_front(batch);
            return Err(e);
        }

        let hash = block.hash().clone();
        let transaction_count = block.transactions().len();
        if let Err(e) = shard.add_block(block.clone()) {
            tracing::warn!("Shard {} rejected block {}: {}", shard_id, hash, e);
            if matches!(e, ChainError::UnknownParent { .. }) {
                self.registry
                    .record_block_outcome(&producer.address, &hash, false, 0.0);
            }
            self.pool.requeue_front(batch);
            return Err(e);
        }

        let started = Instant::now();
        self.broadcaster.broadcast(&block);
        let propagation_time = started.elapsed().as_secs_f64();

        self.registry
            .record_block_outcome(&producer.address, &hash, true, propagation_time);

        let reward = block_reward(transaction_count);
        if let Err(e) = self.registry.reward(&producer.address, reward) {
            tracing::warn!("Failed to reward {} for block {}: {}", producer.address, hash, e);
        }

        tracing::info!(
            "Block {} committed to shard {} by {} ({} txs)",
            hash,
            shard_id,
            producer.address,
            transaction_count
        );

        Ok(Some(BlockReceipt {
            block_hash: hash,
            shard_id,
            producer: producer.address,
            transaction_count,
            propagation_time,
            reward,
        }))
    }

    fn sign(&self, block: &mut DagBlock, producer: &str) -> Result<(), ChainError> {
        for algorithm in &self.config.signature_algorithms {
            let keypair = self.keys.get(producer, algorithm).ok_or_else(|| {
                ChainError::SigningFailure(format!("no {} key for validator {}", algorithm, producer))
            })?;
            let signature = self
                .crypto
                .sign(block.signing_message(), &keypair.secret, algorithm)
                .map_err(|e| ChainError::SigningFailure(format!("{} signing failed: {}", algorithm, e)))?;
            block.add_signature(algorithm.clone(), signature);
        }
        Ok(())
    }

    /// Verify a block received from a peer and commit it to its shard.
    ///
    /// The producer named in the block is not authenticated, and signatures
    /// cover only the stated hash, so a block with a wrong hash, a missing
    /// signature, or no registered key is rejected without a penalty. A
    /// present signature that fails verification is slashed with the
    /// algorithm's severity. That penalty is a heuristic: it trusts the
    /// transport to relay blocks only from the peer that produced them.
    ///
    /// # Errors
    /// `VerificationFailure` on any failed check, or the shard's rejection.
    pub fn verify_incoming(&self, block: DagBlock) -> Result<(), ChainError> {
        let producer = block.producer().to_string();

        if !block.verify_hash() {
            return Err(ChainError::VerificationFailure(format!(
                "block {} from {} has an invalid hash",
                block.hash(),
                producer
            )));
        }

        for algorithm in &self.config.signature_algorithms {
            let public = self.registry.public_key(&producer, algorithm).ok_or_else(|| {
                ChainError::VerificationFailure(format!("no registered {} key for {}", algorithm, producer))
            })?;
            let Some(sig) = block.signatures().get(algorithm) else {
                return Err(ChainError::VerificationFailure(format!(
                    "block {} from {} carries no {} signature",
                    block.hash(),
                    producer,
                    algorithm
                )));
            };
            if !self.crypto.verify(block.signing_message(), sig, &public, algorithm) {
                let severity = self.config.penalties.severity(algorithm);
                self.slash(&producer, &format!("invalid {} signature", algorithm), severity);
                return Err(ChainError::VerificationFailure(format!(
                    "block {} from {} has an invalid {} signature",
                    block.hash(),
                    producer,
                    algorithm
                )));
            }
        }

        let shard_id = block.shard_id();
        let shard = self.shard(shard_id).ok_or_else(|| {
            ChainError::VerificationFailure(format!("block {} targets unknown shard {}", block.hash(), shard_id))
        })?;
        let hash = block.hash().clone();
        shard.add_block(block)?;
        tracing::debug!("Accepted incoming block {} into shard {}", hash, shard_id);
        Ok(())
    }

    fn slash(&self, producer: &str, reason: &str, severity: f64) {
        if let Err(e) = self.registry.penalize(producer, reason, severity) {
            tracing::debug!("Could not penalize {}: {}", producer, e);
        }
    }
}
