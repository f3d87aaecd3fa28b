// crates/hyperchain-consensus/src/lib.rs
//
// hyperchain-consensus: Delegated Proof-of-Quality-Stake for the Hyperchain
// ledger.
//
// This crate decides who produces the next block (the validator registry),
// how the community changes protocol parameters (governance), and glues
// selection, batching, shard storage, signing, and reward accounting into one
// production cycle (the coordinator).

pub mod coordinator;
pub mod governance;
pub mod registry;
pub mod validator;

// Re-export key types for ergonomic access from downstream crates.
pub use coordinator::{BlockReceipt, ConsensusCoordinator, CoordinatorConfig, DEFAULT_BATCH_SIZE};
pub use governance::{
    GovernanceApi, GovernanceEngine, GovernanceProposal, ParameterChange, ProposalAction,
    ProposalStatus, DEFAULT_SLASH_REASON, DEFAULT_VOTING_DURATION_HOURS, QUORUM_THRESHOLD,
};
pub use registry::{selection_score, ValidatorRegistry};
pub use validator::{Validator, ValidatorView};
