// crates/hyperchain-economics/src/rewards.rs
//
// Block production rewards. A producer whose block is accepted into its
// shard earns a flat base reward plus a small amount per included
// transaction. Rewards are added to stake directly.

/// Flat reward for an accepted block.
pub const BASE_BLOCK_REWARD: u64 = 10;

/// Additional reward per transaction included in the block.
pub const PER_TRANSACTION_REWARD: u64 = 1;

/// Reward for an accepted block carrying `transaction_count` transactions.
pub fn block_reward(transaction_count: usize) -> u64 {
    BASE_BLOCK_REWARD.saturating_add(PER_TRANSACTION_REWARD.saturating_mul(transaction_count as u64))
}
