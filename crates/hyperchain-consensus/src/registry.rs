// crates/hyperchain-consensus/src/registry.rs
//
// Validator registry and producer selection.
//
// Selection score for an active validator:
//   0.7 * reputation + 0.3 * min(1, stake / (min_stake * 10))
//
// Stake saturates at ten times the minimum, so beyond that point only
// reputation can lift a validator. Ties go to the smallest address.
//
// Every mutation of the validator table (register, select, reward, penalty,
// activity) happens under one lock. Reputation lives in its own engine with
// its own locks; the registry may call into the engine while holding its
// lock, never the other way round.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use hyperchain_core::{Address, ChainError, Clock, QualityOracle};
use hyperchain_economics::compute_penalty;
use hyperchain_reputation::ReputationEngine;

use crate::validator::{Validator, ValidatorView};

/// Weight of reputation in the selection score.
const REPUTATION_WEIGHT: f64 = 0.7;

/// Weight of the stake factor in the selection score.
const STAKE_WEIGHT: f64 = 0.3;

/// Stake at `STAKE_SATURATION * min_stake` earns the full stake factor.
const STAKE_SATURATION: f64 = 10.0;

/// Selection score of a validator with the given reputation and stake.
pub fn selection_score(reputation: f64, stake: u64, min_stake: u64) -> f64 {
    let stake_factor = if min_stake == 0 {
        1.0
    } else {
        (stake as f64 / (min_stake as f64 * STAKE_SATURATION)).min(1.0)
    };
    REPUTATION_WEIGHT * reputation + STAKE_WEIGHT * stake_factor
}

/// The set of registered validators.
pub struct ValidatorRegistry {
    validators: RwLock<BTreeMap<Address, Validator>>,
    min_stake: u64,
    max_validators: usize,
    reputation: Arc<ReputationEngine>,
    oracle: Option<Arc<dyn QualityOracle>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.read().len())
            .field("min_stake", &self.min_stake)
            .field("max_validators", &self.max_validators)
            .field("oracle", &self.oracle.is_some())
            .finish()
    }
}

impl ValidatorRegistry {
    pub fn new(
        min_stake: u64,
        max_validators: usize,
        reputation: Arc<ReputationEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validators: RwLock::new(BTreeMap::new()),
            min_stake,
            max_validators,
            reputation,
            oracle: None,
            clock,
        }
    }

    /// Attach an off-chain quality oracle, consulted at registration and on
    /// periodic refresh for validators that carry an identity handle.
    pub fn with_oracle(mut self, oracle: Arc<dyn QualityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn reputation(&self) -> &Arc<ReputationEngine> {
        &self.reputation
    }

    pub fn min_stake(&self) -> u64 {
        self.min_stake
    }

    /// Register a new validator.
    ///
    /// The validator starts active with an initial online uptime sample. If
    /// it has an identity handle and an oracle is attached, its code and
    /// community metrics are imported.
    ///
    /// # Errors
    /// `InsufficientStake` below the minimum, `DuplicateAddress` if the
    /// address is taken, `RegistryFull` at `max_validators`.
    pub fn register(
        &self,
        address: &str,
        stake: u64,
        identity: Option<String>,
    ) -> Result<(), ChainError> {
        if stake < self.min_stake {
            return Err(ChainError::InsufficientStake {
                stake,
                minimum: self.min_stake,
            });
        }

        {
            let mut validators = self.validators.write();
            if validators.contains_key(address) {
                return Err(ChainError::DuplicateAddress(address.to_string()));
            }
            if validators.len() >= self.max_validators {
                return Err(ChainError::RegistryFull(self.max_validators));
            }
            let validator = Validator::new(address, stake, identity.clone(), self.clock.now());
            validators.insert(address.to_string(), validator);
            self.reputation.uptime(address, true);
        }

        if let Some(identity) = identity {
            self.import_oracle_metrics(address, &identity, false);
        }

        tracing::info!("Registered validator {} with stake {}", address, stake);
        Ok(())
    }

    /// Fetch off-chain metrics for `address` and feed them to the reputation
    /// engine. When `require_commits` is set, code contributions are only
    /// imported if the oracle reports at least one commit.
    fn import_oracle_metrics(&self, address: &str, identity: &str, require_commits: bool) -> bool {
        let Some(oracle) = &self.oracle else {
            return false;
        };
        let external = oracle.fetch(address, identity);
        let mut imported = false;

        if let Some(github) = external.github {
            if !require_commits || github.commit_count > 0 {
                self.reputation
                    .code_contribution(address, github.lines_added, github.lines_removed, true);
                imported = true;
            }
        }
        if let Some(forum) = external.forum {
            let help = forum.helpful_answers as f64 / forum.posts_count.max(1) as f64;
            let content = forum.reputation_score / 100.0;
            self.reputation.community(address, help, content);
            imported = true;
        }

        if imported {
            tracing::debug!("Imported external metrics for {} ({})", address, identity);
        }
        imported
    }

    /// Re-import off-chain metrics for a validator with an identity handle.
    /// Returns whether anything was recorded.
    pub fn refresh_external_metrics(&self, address: &str) -> Result<bool, ChainError> {
        let identity = self
            .validators
            .read()
            .get(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?
            .identity
            .clone();
        Ok(match identity {
            Some(identity) => self.import_oracle_metrics(address, &identity, true),
            None => false,
        })
    }

    /// Pick the next block producer and mark it active now.
    ///
    /// Returns `None` when no validator is active.
    pub fn select(&self) -> Option<ValidatorView> {
        let mut validators = self.validators.write();

        let mut best: Option<(&Address, f64, f64)> = None;
        for (address, validator) in validators.iter().filter(|(_, v)| v.active) {
            let reputation = self.reputation.score(address);
            let score = selection_score(reputation, validator.stake, self.min_stake);
            // BTreeMap iterates in address order, so a strict comparison
            // keeps the smallest address on ties.
            if best.map_or(true, |(_, best_score, _)| score > best_score) {
                best = Some((address, score, reputation));
            }
        }

        let (address, score, reputation) = best.map(|(a, s, r)| (a.clone(), s, r))?;
        let winner = validators.get_mut(&address)?;
        winner.last_active = self.clock.now();
        tracing::debug!("Selected validator {} (score {:.4})", address, score);
        Some(winner.view(reputation))
    }

    /// Forward a produced block's outcome to the reputation engine.
    pub fn record_block_outcome(
        &self,
        address: &str,
        block_id: &str,
        accepted: bool,
        propagation_time: f64,
    ) {
        self.reputation
            .block_quality(address, block_id, accepted, propagation_time);
    }

    /// Flip a validator's activity flag and record an uptime sample.
    ///
    /// The sample is recorded under the registry lock, so `select` sees the
    /// flag and the reputation change together.
    pub fn set_active(&self, address: &str, online: bool) -> Result<(), ChainError> {
        let mut validators = self.validators.write();
        let validator = validators
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?;
        if validator.active != online {
            tracing::info!("Validator {} is now {}", address, if online { "online" } else { "offline" });
        }
        validator.active = online;
        self.reputation.uptime(address, online);
        Ok(())
    }

    /// Slash `floor(stake * severity)` from a validator and record a penalty
    /// metric. Severity is clamped into [0, 1]; stake never goes negative.
    ///
    /// The stake cut and the penalty metric land in one critical section;
    /// lock order is registry, then reputation, as in `select`.
    ///
    /// Returns the amount slashed.
    pub fn penalize(&self, address: &str, reason: &str, severity: f64) -> Result<u64, ChainError> {
        let (slashed, remaining) = {
            let mut validators = self.validators.write();
            let validator = validators
                .get_mut(address)
                .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?;
            let slashed = compute_penalty(validator.stake, severity);
            validator.stake -= slashed;
            self.reputation.penalty(address);
            (slashed, validator.stake)
        };

        tracing::warn!(
            "Penalized validator {}: slashed {} ({}), remaining stake {}",
            address,
            slashed,
            reason,
            remaining
        );
        Ok(slashed)
    }

    /// Add `amount` to a validator's stake. Returns the new stake.
    pub fn reward(&self, address: &str, amount: u64) -> Result<u64, ChainError> {
        let mut validators = self.validators.write();
        let validator = validators
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?;
        validator.stake = validator.stake.saturating_add(amount);
        tracing::debug!("Rewarded validator {} with {}", address, amount);
        Ok(validator.stake)
    }

    /// Record that a validator cast a governance vote.
    pub fn record_governance_vote(&self, address: &str, proposal_id: &str) {
        self.reputation
            .governance_participation(address, proposal_id, true);
    }

    pub fn stats(&self, address: &str) -> Option<ValidatorView> {
        let validators = self.validators.read();
        validators
            .get(address)
            .map(|v| v.view(self.reputation.score(address)))
    }

    /// Publish the public key a validator signs with under `algorithm`.
    pub fn set_public_key(
        &self,
        address: &str,
        algorithm: &str,
        key: Vec<u8>,
    ) -> Result<(), ChainError> {
        let mut validators = self.validators.write();
        let validator = validators
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?;
        validator.public_keys.insert(algorithm.to_string(), key);
        Ok(())
    }

    pub fn public_key(&self, address: &str, algorithm: &str) -> Option<Vec<u8>> {
        self.validators
            .read()
            .get(address)
            .and_then(|v| v.public_keys.get(algorithm).cloned())
    }

    /// All registered addresses in ascending order.
    pub fn addresses(&self) -> Vec<Address> {
        self.validators.read().keys().cloned().collect()
    }

    pub fn active_validators(&self) -> Vec<ValidatorView> {
        self.validators
            .read()
            .values()
            .filter(|v| v.active)
            .map(|v| v.view(self.reputation.score(&v.address)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.validators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.read().is_empty()
    }
}
