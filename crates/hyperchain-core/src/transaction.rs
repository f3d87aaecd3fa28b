// crates/hyperchain-core/src/transaction.rs
//
// Transactions and the in-memory FIFO pool that feeds block production.
// The consensus core treats transactions as opaque payloads: only their
// hashes (for the merkle commitment) and their order matter.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::crypto::hash_bytes;
use crate::traits::TransactionSource;

/// A value transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    /// Signatures keyed by algorithm tag. Not covered by the hash.
    #[serde(default)]
    pub signatures: BTreeMap<String, Vec<u8>>,
}

/// Canonical hashing view. Field order is fixed by declaration order.
#[derive(Serialize)]
struct TransactionDigest<'a> {
    sender: &'a str,
    receiver: &'a str,
    amount: f64,
    timestamp: i64,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
            signatures: BTreeMap::new(),
        }
    }

    /// SHA-256 over the canonical JSON of {sender, receiver, amount,
    /// timestamp (ms)}.
    pub fn hash_bytes(&self) -> [u8; 32] {
        let digest = TransactionDigest {
            sender: &self.sender,
            receiver: &self.receiver,
            amount: self.amount,
            timestamp: self.timestamp.timestamp_millis(),
        };
        hash_bytes(&serde_json::to_vec(&digest).unwrap_or_default())
    }

    /// Hex form of [`Transaction::hash_bytes`].
    pub fn hash(&self) -> String {
        hex::encode(self.hash_bytes())
    }

    pub fn add_signature(&mut self, algorithm: impl Into<String>, signature: Vec<u8>) {
        self.signatures.insert(algorithm.into(), signature);
    }
}

/// FIFO transaction pool.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<VecDeque<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionSource for TransactionPool {
    fn get_batch(&self, max_count: usize) -> Vec<Transaction> {
        let mut pending = self.pending.lock();
        let take = max_count.min(pending.len());
        pending.drain(..take).collect()
    }

    fn add(&self, transaction: Transaction) {
        self.pending.lock().push_back(transaction);
    }

    fn requeue_front(&self, batch: Vec<Transaction>) {
        let mut pending = self.pending.lock();
        for tx in batch.into_iter().rev() {
            pending.push_front(tx);
        }
    }

    fn size(&self) -> usize {
        self.pending.lock().len()
    }
}
