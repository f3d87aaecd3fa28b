// crates/hyperchain-consensus/src/governance.rs
//
// On-chain governance: typed proposals, one vote per validator per proposal,
// and a supermajority rule applied once the voting window has closed.
//
// Lifecycle: Pending -> Open -> ClosedUnexecuted | ClosedExecuted.
// A proposal executes at most once, and only after its window has closed
// with more than 66% of the cast votes in favour.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hyperchain_core::{Address, ChainError, Clock};
use hyperchain_economics::DEFAULT_PENALTY_SEVERITY;
use hyperchain_reputation::MetricType;

use crate::registry::ValidatorRegistry;

/// Share of votes in favour a proposal must exceed to execute.
pub const QUORUM_THRESHOLD: f64 = 0.66;

/// Voting window length when the proposer does not pick one.
pub const DEFAULT_VOTING_DURATION_HOURS: i64 = 24;

/// Slashing reason when a proposal does not carry one.
pub const DEFAULT_SLASH_REASON: &str = "Governance decision";

/// What a proposal does once it passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalAction {
    /// Set a named protocol parameter. Recorded in the applied-parameter log.
    ParameterChange { name: String, value: serde_json::Value },

    /// Merge new weights into the reputation weight map.
    ReputationWeights { weights: BTreeMap<MetricType, f64> },

    /// Slash a validator's stake.
    ValidatorSlashing {
        validator: Address,
        severity: Option<f64>,
        reason: Option<String>,
    },

    /// Announce a protocol upgrade. Only logged.
    NetworkUpgrade { version: String },
}

impl ProposalAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ProposalAction::ParameterChange { .. } => "parameter_change",
            ProposalAction::ReputationWeights { .. } => "reputation_weights",
            ProposalAction::ValidatorSlashing { .. } => "validator_slashing",
            ProposalAction::NetworkUpgrade { .. } => "network_upgrade",
        }
    }
}

/// Where a proposal is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Voting window has not started yet.
    Pending,
    /// Votes are accepted.
    Open,
    /// Window closed without (yet) executing.
    ClosedUnexecuted,
    /// Window closed and the action was applied.
    ClosedExecuted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub id: String,
    pub action: ProposalAction,
    pub title: String,
    pub description: String,
    pub proposer: Address,
    pub start_time: DateTime<Utc>,
    /// Exclusive end of the voting window.
    pub end_time: DateTime<Utc>,
    pub votes_for: u64,
    pub votes_against: u64,
    pub executed: bool,
}

impl GovernanceProposal {
    pub fn status(&self, now: DateTime<Utc>) -> ProposalStatus {
        if now < self.start_time {
            ProposalStatus::Pending
        } else if now < self.end_time {
            ProposalStatus::Open
        } else if self.executed {
            ProposalStatus::ClosedExecuted
        } else {
            ProposalStatus::ClosedUnexecuted
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.votes_for + self.votes_against
    }

    /// Whether the cast votes clear the supermajority threshold.
    pub fn has_quorum(&self) -> bool {
        let total = self.total_votes();
        total > 0 && self.votes_for as f64 / total as f64 > QUORUM_THRESHOLD
    }
}

/// An applied parameter change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub proposal_id: String,
    pub name: String,
    pub value: serde_json::Value,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct GovernanceState {
    proposals: BTreeMap<String, GovernanceProposal>,
    voted: HashSet<(String, Address)>,
}

/// Proposal book and vote tallies.
#[derive(Debug)]
pub struct GovernanceEngine {
    state: RwLock<GovernanceState>,
    parameter_log: RwLock<Vec<ParameterChange>>,
    registry: Arc<ValidatorRegistry>,
    clock: Arc<dyn Clock>,
}

impl GovernanceEngine {
    pub fn new(registry: Arc<ValidatorRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(GovernanceState::default()),
            parameter_log: RwLock::new(Vec::new()),
            registry,
            clock,
        }
    }

    /// Open a proposal whose voting window is `[now, now + duration)`.
    /// Returns the proposal id.
    ///
    /// # Errors
    /// `InvalidVotingWindow` if `duration` is not positive or the window
    /// would end past the representable time range. Nothing is stored.
    pub fn create(
        &self,
        action: ProposalAction,
        title: &str,
        description: &str,
        proposer: &str,
        duration: Duration,
    ) -> Result<String, ChainError> {
        if duration <= Duration::zero() {
            return Err(ChainError::InvalidVotingWindow(format!(
                "duration {} is not positive",
                duration
            )));
        }
        let start_time = self.clock.now();
        let end_time = start_time.checked_add_signed(duration).ok_or_else(|| {
            ChainError::InvalidVotingWindow(format!("{} past {} overflows", duration, start_time))
        })?;
        let id = Uuid::now_v7().to_string();
        let proposal = GovernanceProposal {
            id: id.clone(),
            action,
            title: title.to_string(),
            description: description.to_string(),
            proposer: proposer.to_string(),
            start_time,
            end_time,
            votes_for: 0,
            votes_against: 0,
            executed: false,
        };
        tracing::info!(
            "Proposal {} ({}) created by {}: {}",
            id,
            proposal.action.kind(),
            proposer,
            title
        );
        self.state.write().proposals.insert(id.clone(), proposal);
        Ok(id)
    }

    /// Cast a vote.
    ///
    /// # Errors
    /// `ProposalNotFound`, `VotingWindowClosed` outside `[start, end)`, or
    /// `AlreadyVoted` on a repeat vote. A rejected vote changes nothing.
    pub fn vote(&self, proposal_id: &str, voter: &str, support: bool) -> Result<(), ChainError> {
        let now = self.clock.now();
        {
            let mut state = self.state.write();
            let key = (proposal_id.to_string(), voter.to_string());
            if state.voted.contains(&key) {
                return Err(ChainError::AlreadyVoted {
                    proposal: proposal_id.to_string(),
                    voter: voter.to_string(),
                });
            }
            let proposal = state
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| ChainError::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status(now) != ProposalStatus::Open {
                return Err(ChainError::VotingWindowClosed(proposal_id.to_string()));
            }
            if support {
                proposal.votes_for += 1;
            } else {
                proposal.votes_against += 1;
            }
            state.voted.insert(key);
        }

        tracing::debug!("{} voted {} on proposal {}", voter, if support { "for" } else { "against" }, proposal_id);
        self.registry.record_governance_vote(voter, proposal_id);
        self.try_execute(proposal_id)?;
        Ok(())
    }

    /// Execute the proposal if its window has closed, it has quorum, and it
    /// has not run yet. Returns whether it executed on this call.
    pub fn try_execute(&self, proposal_id: &str) -> Result<bool, ChainError> {
        let now = self.clock.now();
        let action = {
            let mut state = self.state.write();
            let proposal = state
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| ChainError::ProposalNotFound(proposal_id.to_string()))?;
            if proposal.status(now) != ProposalStatus::ClosedUnexecuted || !proposal.has_quorum() {
                return Ok(false);
            }
            proposal.executed = true;
            proposal.action.clone()
        };

        self.apply(proposal_id, action, now);
        Ok(true)
    }

    fn apply(&self, proposal_id: &str, action: ProposalAction, now: DateTime<Utc>) {
        match action {
            ProposalAction::ParameterChange { name, value } => {
                tracing::info!("Proposal {}: parameter {} set to {}", proposal_id, name, value);
                self.parameter_log.write().push(ParameterChange {
                    proposal_id: proposal_id.to_string(),
                    name,
                    value,
                    applied_at: now,
                });
            }
            ProposalAction::ReputationWeights { weights } => {
                tracing::info!("Proposal {}: updating reputation weights", proposal_id);
                self.registry.reputation().update_weights(&weights);
            }
            ProposalAction::ValidatorSlashing {
                validator,
                severity,
                reason,
            } => {
                let severity = severity.unwrap_or(DEFAULT_PENALTY_SEVERITY);
                let reason = reason.unwrap_or_else(|| DEFAULT_SLASH_REASON.to_string());
                if let Err(e) = self.registry.penalize(&validator, &reason, severity) {
                    tracing::warn!("Proposal {}: slashing {} failed: {}", proposal_id, validator, e);
                }
            }
            ProposalAction::NetworkUpgrade { version } => {
                tracing::info!("Proposal {}: network upgrade to {} approved", proposal_id, version);
            }
        }
    }

    /// Attempt execution of every closed, unexecuted proposal. Returns the
    /// ids that executed.
    pub fn finalize_expired(&self) -> Vec<String> {
        let now = self.clock.now();
        let candidates: Vec<String> = self
            .state
            .read()
            .proposals
            .values()
            .filter(|p| p.status(now) == ProposalStatus::ClosedUnexecuted)
            .map(|p| p.id.clone())
            .collect();

        candidates
            .into_iter()
            .filter(|id| match self.try_execute(id) {
                Ok(executed) => executed,
                Err(e) => {
                    tracing::warn!("Finalizing proposal {} failed: {}", id, e);
                    false
                }
            })
            .collect()
    }

    pub fn status(&self, proposal_id: &str) -> Option<ProposalStatus> {
        let now = self.clock.now();
        self.state
            .read()
            .proposals
            .get(proposal_id)
            .map(|p| p.status(now))
    }

    pub fn get(&self, proposal_id: &str) -> Option<GovernanceProposal> {
        self.state.read().proposals.get(proposal_id).cloned()
    }

    /// All proposals, oldest first.
    pub fn proposals(&self) -> Vec<GovernanceProposal> {
        self.state.read().proposals.values().cloned().collect()
    }

    pub fn parameter_changes(&self) -> Vec<ParameterChange> {
        self.parameter_log.read().clone()
    }
}

/// Caller-facing governance entry points.
#[derive(Debug, Clone)]
pub struct GovernanceApi {
    engine: Arc<GovernanceEngine>,
}

impl GovernanceApi {
    pub fn new(engine: Arc<GovernanceEngine>) -> Self {
        Self { engine }
    }

    /// Create a proposal; `duration` defaults to 24 hours.
    ///
    /// # Errors
    /// `InvalidVotingWindow`, see [`GovernanceEngine::create`].
    pub fn create_proposal(
        &self,
        action: ProposalAction,
        title: &str,
        description: &str,
        proposer: &str,
        duration: Option<Duration>,
    ) -> Result<String, ChainError> {
        let duration = duration.unwrap_or_else(|| Duration::hours(DEFAULT_VOTING_DURATION_HOURS));
        self.engine
            .create(action, title, description, proposer, duration)
    }

    /// Cast a vote. Returns false if it was rejected.
    pub fn vote_on_proposal(&self, proposal_id: &str, voter: &str, support: bool) -> bool {
        match self.engine.vote(proposal_id, voter, support) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Vote by {} on {} rejected: {}", voter, proposal_id, e);
                false
            }
        }
    }
}
