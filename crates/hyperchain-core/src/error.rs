use thiserror::Error;

/// Protocol-wide error types for the Hyperchain ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainError {
    /// Registration attempted with less than the configured minimum stake.
    #[error("Insufficient stake: {stake} is below the minimum of {minimum}")]
    InsufficientStake { stake: u64, minimum: u64 },

    /// A validator with this address is already registered.
    #[error("Duplicate validator address: {0}")]
    DuplicateAddress(String),

    /// The registry already holds `max_validators` records.
    #[error("Validator registry is full ({0} validators)")]
    RegistryFull(usize),

    /// No validator is registered under this address.
    #[error("Unknown validator: {0}")]
    UnknownValidator(String),

    /// A block references a parent hash the shard has never stored.
    #[error("Unknown parent block {parent} in shard {shard_id}")]
    UnknownParent { shard_id: u32, parent: String },

    /// A block with this hash is already part of the shard.
    #[error("Duplicate block {0}")]
    DuplicateBlock(String),

    /// The crypto provider does not implement this signature algorithm.
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No governance proposal with this id exists.
    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    /// Vote cast before the window opened or after it closed.
    #[error("Voting window closed for proposal {0}")]
    VotingWindowClosed(String),

    /// A proposal's voting window is empty or ends past the representable
    /// time range.
    #[error("Invalid voting window: {0}")]
    InvalidVotingWindow(String),

    /// The (proposal, voter) pair has already voted.
    #[error("Validator {voter} already voted on proposal {proposal}")]
    AlreadyVoted { proposal: String, voter: String },

    /// Producing a signature failed (missing key, provider error).
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// An incoming block failed hash or signature verification.
    #[error("Verification failure: {0}")]
    VerificationFailure(String),

    /// Key material could not be decoded or generated.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for ChainError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        ChainError::Crypto(e.to_string())
    }
}
