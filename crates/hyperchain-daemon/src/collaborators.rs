// crates/hyperchain-daemon/src/collaborators.rs
//
// Stand-in network collaborators for a single-process node: a broadcaster
// that only logs, and a probe that reports a fixed healthy network.

use hyperchain_core::NetworkProbe;
use hyperchain_store::{BroadcastSink, DagBlock};

/// Broadcast sink that logs each block instead of sending it to peers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBroadcaster;

impl BroadcastSink for LoggingBroadcaster {
    fn broadcast(&self, block: &DagBlock) {
        tracing::debug!(
            "Broadcasting block {} (shard {}, {} txs, producer {})",
            block.hash(),
            block.shard_id(),
            block.transactions().len(),
            block.producer()
        );
    }
}

/// Network probe reporting every validator online with fixed peer count
/// and bandwidth.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe {
    pub peers: u32,
    /// MB/s.
    pub bandwidth: f64,
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self {
            peers: 25,
            bandwidth: 500.0,
        }
    }
}

impl NetworkProbe for StaticProbe {
    fn is_online(&self, _address: &str) -> bool {
        true
    }

    fn peers_connected(&self) -> u32 {
        self.peers
    }

    fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}
