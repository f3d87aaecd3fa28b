// crates/hyperchain-store/src/lib.rs
//
// hyperchain-store: In-memory DAG ledger for the Hyperchain DPoQS protocol.
//
// The ledger is split into shards that are mutated independently. Each shard
// keeps an append-only sequence of blocks and the set of tips (blocks with no
// known child). Blocks commit to their transactions through a merkle root and
// bind shard, root, timestamp, parents, and producer in a content hash.

pub mod assign;
pub mod block;
pub mod broadcast;
pub mod merkle;
pub mod shard;

// Re-export key types for ergonomic access from downstream crates.
pub use assign::{RoutingKey, ShardAssigner};
pub use block::DagBlock;
pub use broadcast::BroadcastSink;
pub use merkle::{merkle_root, EMPTY_MERKLE_ROOT};
pub use shard::{DagShard, ShardStats};
