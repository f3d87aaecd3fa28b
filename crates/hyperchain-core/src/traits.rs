// crates/hyperchain-core/src/traits.rs

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

/// Source of pending transactions for block production.
///
/// Implemented by `TransactionPool`.
pub trait TransactionSource: Send + Sync {
    /// Remove and return up to `max_count` transactions in FIFO order.
    fn get_batch(&self, max_count: usize) -> Vec<Transaction>;

    /// Append a transaction to the back of the queue.
    fn add(&self, transaction: Transaction);

    /// Put a batch back at the front of the queue, preserving its order.
    /// Used when a production cycle aborts before the batch was committed.
    fn requeue_front(&self, batch: Vec<Transaction>);

    /// Number of pending transactions.
    fn size(&self) -> usize;
}

/// Code contribution counters reported by an off-chain source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubContributions {
    pub lines_added: u64,
    pub lines_removed: u64,
    pub commit_count: u64,
}

/// Forum participation counters reported by an off-chain source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForumActivity {
    pub posts_count: u64,
    pub helpful_answers: u64,
    /// Forum reputation on a 0..=100 scale.
    pub reputation_score: f64,
}

/// Everything an oracle knows about a validator's off-chain activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalMetrics {
    pub github: Option<GithubContributions>,
    pub forum: Option<ForumActivity>,
}

/// Off-chain quality metrics, looked up by the validator's external
/// identity handle.
pub trait QualityOracle: Send + Sync {
    fn fetch(&self, address: &str, identity: &str) -> ExternalMetrics;
}

/// Oracle that knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOracle;

impl QualityOracle for NullOracle {
    fn fetch(&self, _address: &str, _identity: &str) -> ExternalMetrics {
        ExternalMetrics::default()
    }
}

/// Local view of network conditions, used by the uptime and reputation
/// workers.
pub trait NetworkProbe: Send + Sync {
    /// Whether the validator currently answers liveness checks.
    fn is_online(&self, address: &str) -> bool;

    /// Number of connected peers.
    fn peers_connected(&self) -> u32;

    /// Bandwidth in MB/s.
    fn bandwidth(&self) -> f64;
}
