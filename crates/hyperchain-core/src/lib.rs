// crates/hyperchain-core/src/lib.rs
//
// hyperchain-core: Core types, collaborator traits, and crypto primitives for
// the Hyperchain DPoQS ledger.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines the error taxonomy, hashing and signing helpers, the clock
// abstraction, transactions, and the traits through which the consensus core
// talks to its external collaborators (transaction source, quality oracle,
// network probe).

pub mod clock;
pub mod crypto;
pub mod error;
pub mod traits;
pub mod transaction;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use hyperchain_core::ChainError;`

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{hash_bytes, hash_hex, CryptoProvider, Ed25519Provider, KeyPair, KeyStore};
pub use error::ChainError;
pub use traits::{
    ExternalMetrics, ForumActivity, GithubContributions, NetworkProbe, NullOracle,
    QualityOracle, TransactionSource,
};
pub use transaction::{Transaction, TransactionPool};

/// Unique validator identifier.
pub type Address = String;

/// Lowercase hex rendering of a 32-byte SHA-256 digest.
pub type BlockHash = String;
