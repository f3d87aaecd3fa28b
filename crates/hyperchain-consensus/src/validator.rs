// crates/hyperchain-consensus/src/validator.rs
//
// Validator records held by the registry, and the read-only view handed out
// to callers. The reputation score is never stored on the record: it lives in
// the reputation engine and is attached when a view is built.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hyperchain_core::Address;

/// A staked participant eligible to produce blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    /// Bonded stake. Penalties floor at zero.
    pub stake: u64,
    pub active: bool,
    /// Last time this validator was selected as producer (or registered).
    pub last_active: DateTime<Utc>,
    /// Handle used to look the validator up in off-chain quality oracles.
    pub identity: Option<String>,
    /// Public key bytes per signature algorithm, used to verify blocks this
    /// validator produced.
    #[serde(default)]
    pub public_keys: BTreeMap<String, Vec<u8>>,
}

impl Validator {
    pub fn new(
        address: impl Into<Address>,
        stake: u64,
        identity: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            stake,
            active: true,
            last_active: now,
            identity,
            public_keys: BTreeMap::new(),
        }
    }

    pub fn view(&self, reputation: f64) -> ValidatorView {
        ValidatorView {
            address: self.address.clone(),
            stake: self.stake,
            reputation,
            active: self.active,
            last_active: self.last_active,
            identity: self.identity.clone(),
        }
    }
}

/// Snapshot of a validator with its current reputation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorView {
    pub address: Address,
    pub stake: u64,
    pub reputation: f64,
    pub active: bool,
    pub last_active: DateTime<Utc>,
    pub identity: Option<String>,
}
