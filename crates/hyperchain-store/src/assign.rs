// crates/hyperchain-store/src/assign.rs
//
// Deterministic shard routing for block production.
//
// A batch is routed by the hash of its first transaction, so every node that
// sees the same batch head puts it on the same shard. An empty batch has no
// head; it is routed by the production tick instead, which spreads idle
// blocks across shards.

use hyperchain_core::Transaction;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// What a batch is routed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKey {
    /// Content hash of the batch's first transaction.
    Transaction([u8; 32]),
    /// Production tick of an empty batch.
    Tick(u64),
}

impl RoutingKey {
    pub fn for_batch(batch: &[Transaction], tick: u64) -> Self {
        match batch.first() {
            Some(head) => RoutingKey::Transaction(head.hash_bytes()),
            None => RoutingKey::Tick(tick),
        }
    }

    fn fold(&self) -> u64 {
        match self {
            RoutingKey::Transaction(hash) => fnv1a(hash),
            RoutingKey::Tick(tick) => fnv1a(&tick.to_be_bytes()),
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET_BASIS, |hash, &b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Maps routing keys onto `[0, sharding_factor)`.
#[derive(Debug, Clone)]
pub struct ShardAssigner {
    sharding_factor: u32,
}

impl ShardAssigner {
    /// # Panics
    /// Panics if `sharding_factor` is 0.
    pub fn new(sharding_factor: u32) -> Self {
        assert!(sharding_factor > 0, "sharding_factor must be at least 1");
        Self { sharding_factor }
    }

    pub fn assign(&self, key: &RoutingKey) -> u32 {
        (key.fold() % u64::from(self.sharding_factor)) as u32
    }

    /// Shard for a production batch drawn at `tick`.
    pub fn route(&self, batch: &[Transaction], tick: u64) -> u32 {
        self.assign(&RoutingKey::for_batch(batch, tick))
    }

    pub fn sharding_factor(&self) -> u32 {
        self.sharding_factor
    }
}
