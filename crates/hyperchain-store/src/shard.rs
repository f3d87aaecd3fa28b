// crates/hyperchain-store/src/shard.rs
//
// One shard of the DAG ledger: an append-only block sequence plus the tip
// set, guarded by a single lock so that shards mutate independently.
//
// Invariants:
//   - every parent of a stored block is itself stored, except for the first
//     (genesis) block of the shard;
//   - tips == {stored hashes} - {hashes referenced as a parent}.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use hyperchain_core::{BlockHash, ChainError, Transaction};

use crate::block::DagBlock;

/// Summary of a shard's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    pub shard_id: u32,
    pub block_count: usize,
    pub transaction_count: usize,
    pub tips_count: usize,
    pub latest_block: Option<BlockHash>,
}

#[derive(Debug, Default)]
struct ShardInner {
    blocks: Vec<DagBlock>,
    index: HashMap<BlockHash, usize>,
    tips: BTreeSet<BlockHash>,
}

#[derive(Debug)]
pub struct DagShard {
    shard_id: u32,
    inner: RwLock<ShardInner>,
}

impl DagShard {
    pub fn new(shard_id: u32) -> Self {
        Self {
            shard_id,
            inner: RwLock::new(ShardInner::default()),
        }
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Current frontier, in hash order.
    pub fn tips(&self) -> BTreeSet<BlockHash> {
        self.inner.read().tips.clone()
    }

    /// Append a block.
    ///
    /// In a non-empty shard every parent hash must already be stored. The
    /// first block is accepted whatever its parent list. A rejected block
    /// leaves the shard untouched.
    ///
    /// # Errors
    /// `UnknownParent` for a missing parent, `DuplicateBlock` if the hash is
    /// already stored.
    pub fn add_block(&self, block: DagBlock) -> Result<(), ChainError> {
        let mut inner = self.inner.write();

        if inner.index.contains_key(block.hash()) {
            return Err(ChainError::DuplicateBlock(block.hash().clone()));
        }

        if !inner.blocks.is_empty() {
            if let Some(missing) = block
                .previous_hashes()
                .iter()
                .find(|parent| !inner.index.contains_key(*parent))
            {
                return Err(ChainError::UnknownParent {
                    shard_id: self.shard_id,
                    parent: missing.clone(),
                });
            }
        }

        for parent in block.previous_hashes() {
            inner.tips.remove(parent);
        }
        let hash = block.hash().clone();
        inner.tips.insert(hash.clone());
        let position = inner.blocks.len();
        inner.index.insert(hash.clone(), position);
        inner.blocks.push(block);

        tracing::debug!("Shard {}: added block {} at height {}", self.shard_id, hash, position);
        Ok(())
    }

    pub fn get_block(&self, hash: &str) -> Option<DagBlock> {
        let inner = self.inner.read();
        inner.index.get(hash).map(|&i| inner.blocks[i].clone())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.inner.read().index.contains_key(hash)
    }

    /// Blocks created at or after `timestamp`, in commit order.
    pub fn blocks_since(&self, timestamp: DateTime<Utc>) -> Vec<DagBlock> {
        self.inner
            .read()
            .blocks
            .iter()
            .filter(|b| b.timestamp() >= timestamp)
            .cloned()
            .collect()
    }

    /// Every transaction in the shard, in commit order.
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.inner
            .read()
            .blocks
            .iter()
            .flat_map(|b| b.transactions().iter().cloned())
            .collect()
    }

    pub fn stats(&self) -> ShardStats {
        let inner = self.inner.read();
        ShardStats {
            shard_id: self.shard_id,
            block_count: inner.blocks.len(),
            transaction_count: inner.blocks.iter().map(|b| b.transactions().len()).sum(),
            tips_count: inner.tips.len(),
            latest_block: inner.blocks.last().map(|b| b.hash().clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().blocks.is_empty()
    }
}
