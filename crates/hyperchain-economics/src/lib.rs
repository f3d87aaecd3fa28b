// crates/hyperchain-economics/src/lib.rs
//
// hyperchain-economics: stake arithmetic for the Hyperchain DPoQS ledger.
//
// Stake is an integer amount with no fixed unit. Penalties remove a fraction
// of a validator's stake and never drive it below zero; rewards add to it
// without an upper bound.

pub mod rewards;
pub mod slashing;

// Re-export key types for ergonomic access from downstream crates.
pub use rewards::{block_reward, BASE_BLOCK_REWARD, PER_TRANSACTION_REWARD};
pub use slashing::{clamp_severity, compute_penalty, SignaturePenalties, DEFAULT_PENALTY_SEVERITY};
