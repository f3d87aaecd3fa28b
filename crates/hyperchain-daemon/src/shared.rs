// crates/hyperchain-daemon/src/shared.rs
//
// NodeContext: every long-lived component of the node, built once in
// main.rs and handed to the workers as `Arc` handles.
//
// The components lock internally, so the context itself is immutable and
// cheap to clone.

use std::sync::Arc;
use std::time::Instant;

use hyperchain_consensus::{ConsensusCoordinator, GovernanceEngine, ValidatorRegistry};
use hyperchain_core::{
    ChainError, Clock, CryptoProvider, Ed25519Provider, KeyStore, NetworkProbe, QualityOracle,
    TransactionPool,
};
use hyperchain_reputation::ReputationEngine;
use hyperchain_store::BroadcastSink;

use crate::config::{DaemonConfig, LocalValidator};

/// Shared handles to the node's components.
#[derive(Clone)]
pub struct NodeContext {
    pub config: Arc<DaemonConfig>,
    pub clock: Arc<dyn Clock>,
    pub reputation: Arc<ReputationEngine>,
    pub registry: Arc<ValidatorRegistry>,
    pub governance: Arc<GovernanceEngine>,
    pub pool: Arc<TransactionPool>,
    pub keys: Arc<KeyStore>,
    pub crypto: Arc<dyn CryptoProvider>,
    pub coordinator: Arc<ConsensusCoordinator>,
    pub probe: Arc<dyn NetworkProbe>,
    /// Daemon start time for uptime reporting.
    pub start_time: Instant,
}

impl NodeContext {
    pub fn new(
        config: DaemonConfig,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn QualityOracle>,
        probe: Arc<dyn NetworkProbe>,
        broadcaster: Arc<dyn BroadcastSink>,
    ) -> Self {
        let reputation = Arc::new(ReputationEngine::new(clock.clone()));
        let registry = Arc::new(
            ValidatorRegistry::new(
                config.min_stake,
                config.max_validators,
                reputation.clone(),
                clock.clone(),
            )
            .with_oracle(oracle),
        );
        let governance = Arc::new(GovernanceEngine::new(registry.clone(), clock.clone()));
        let pool = Arc::new(TransactionPool::new());
        let keys = Arc::new(KeyStore::new());
        let crypto: Arc<dyn CryptoProvider> = Arc::new(Ed25519Provider);
        let coordinator = Arc::new(ConsensusCoordinator::new(
            config.coordinator_config(),
            registry.clone(),
            pool.clone(),
            crypto.clone(),
            keys.clone(),
            broadcaster,
            clock.clone(),
        ));

        Self {
            config: Arc::new(config),
            clock,
            reputation,
            registry,
            governance,
            pool,
            keys,
            crypto,
            coordinator,
            probe,
            start_time: Instant::now(),
        }
    }

    /// Register a validator operated by this node: generate one keypair per
    /// configured algorithm and publish the public keys to the registry.
    pub fn enroll(&self, validator: &LocalValidator) -> Result<(), ChainError> {
        let publics = self.keys.generate_for(
            &validator.address,
            self.crypto.as_ref(),
            &self.config.signature_algorithms,
        )?;
        self.registry
            .register(&validator.address, validator.stake, validator.identity.clone())?;
        for (algorithm, key) in publics {
            self.registry
                .set_public_key(&validator.address, &algorithm, key)?;
        }
        Ok(())
    }

    /// Enroll every validator listed in the configuration. Failures are
    /// logged and skipped. Returns how many were enrolled.
    pub fn enroll_configured(&self) -> usize {
        let mut enrolled = 0;
        for validator in &self.config.validators {
            match self.enroll(validator) {
                Ok(()) => enrolled += 1,
                Err(e) => tracing::warn!("Could not enroll validator {}: {}", validator.address, e),
            }
        }
        enrolled
    }
}
