// crates/hyperchain-store/src/broadcast.rs

use crate::block::DagBlock;

/// Outbound channel for committed blocks.
///
/// Fire-and-forget: the consensus core assumes nothing about delivery.
/// Implemented by the daemon's peer layer.
pub trait BroadcastSink: Send + Sync {
    fn broadcast(&self, block: &DagBlock);
}
