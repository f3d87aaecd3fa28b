// crates/hyperchain-daemon/src/workers.rs
//
// Background workers of a validator node:
//   - block production   every `block_time`
//   - uptime check       every 30 s
//   - reputation push    every `reputation_update_interval` (oracle refresh hourly)
//   - governance sweep   every 10 s
//   - DAG sync           every 5 s (logs shard stats; no peer transport yet)

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use hyperchain_core::ChainError;

use crate::scheduler::PeriodicTask;
use crate::shared::NodeContext;

pub const UPTIME_CHECK_INTERVAL: Duration = Duration::from_secs(30);
pub const GOVERNANCE_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const DAG_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// How often off-chain oracle metrics are re-imported.
const ORACLE_REFRESH_HOURS: i64 = 1;

/// Run one block production cycle.
pub fn produce_block(ctx: &NodeContext) -> Result<(), ChainError> {
    if let Some(receipt) = ctx.coordinator.produce_block()? {
        tracing::trace!(
            "Produced block {} on shard {} ({} txs, {:.4}s propagation)",
            receipt.block_hash,
            receipt.shard_id,
            receipt.transaction_count,
            receipt.propagation_time
        );
    }
    Ok(())
}

/// Probe every registered validator and record its liveness.
pub fn check_uptime(ctx: &NodeContext) -> Result<(), ChainError> {
    for address in ctx.registry.addresses() {
        let online = ctx.probe.is_online(&address);
        ctx.registry.set_active(&address, online)?;
    }
    Ok(())
}

/// Tracks when oracle metrics were last refreshed.
#[derive(Debug, Default)]
pub struct ReputationPush {
    last_oracle_refresh: Option<DateTime<Utc>>,
}

impl ReputationPush {
    /// Record network health for every active validator, and re-import
    /// oracle metrics if the last refresh is an hour old.
    pub fn tick(&mut self, ctx: &NodeContext) -> Result<(), ChainError> {
        let peers = ctx.probe.peers_connected();
        let bandwidth = ctx.probe.bandwidth();
        let active = ctx.registry.active_validators();
        for validator in &active {
            ctx.reputation
                .network_health(&validator.address, peers, bandwidth);
        }

        let now = ctx.clock.now();
        let refresh_due = self
            .last_oracle_refresh
            .map_or(true, |last| now - last >= chrono::Duration::hours(ORACLE_REFRESH_HOURS));
        if refresh_due {
            let mut refreshed = 0;
            for validator in &active {
                if ctx.registry.refresh_external_metrics(&validator.address)? {
                    refreshed += 1;
                }
            }
            self.last_oracle_refresh = Some(now);
            tracing::debug!("Refreshed oracle metrics for {} validators", refreshed);
        }

        tracing::debug!("Reputation push for {} active validators", active.len());
        Ok(())
    }
}

/// Execute every proposal whose window has closed with quorum.
pub fn sweep_governance(ctx: &NodeContext) -> Result<(), ChainError> {
    let executed = ctx.governance.finalize_expired();
    if !executed.is_empty() {
        tracing::info!("Governance sweep executed {} proposals: {:?}", executed.len(), executed);
    }
    Ok(())
}

/// Report shard state. Peer synchronization is not implemented.
pub fn sync_dag(ctx: &NodeContext) -> Result<(), ChainError> {
    for stats in ctx.coordinator.shard_stats() {
        tracing::debug!(
            "DAG sync: shard {} has {} blocks, {} txs, {} tips",
            stats.shard_id,
            stats.block_count,
            stats.transaction_count,
            stats.tips_count
        );
    }
    Ok(())
}

/// Spawn every worker on the shared shutdown signal.
pub fn spawn_all(ctx: &NodeContext, shutdown: watch::Receiver<bool>) -> Vec<PeriodicTask> {
    let mut tasks = Vec::new();

    let c = ctx.clone();
    tasks.push(PeriodicTask::spawn(
        "block-production",
        ctx.config.block_interval(),
        shutdown.clone(),
        move || produce_block(&c),
    ));

    let c = ctx.clone();
    tasks.push(PeriodicTask::spawn(
        "uptime",
        UPTIME_CHECK_INTERVAL,
        shutdown.clone(),
        move || check_uptime(&c),
    ));

    let c = ctx.clone();
    let mut push = ReputationPush::default();
    tasks.push(PeriodicTask::spawn(
        "reputation",
        ctx.config.reputation_interval(),
        shutdown.clone(),
        move || push.tick(&c),
    ));

    let c = ctx.clone();
    tasks.push(PeriodicTask::spawn(
        "governance",
        GOVERNANCE_SWEEP_INTERVAL,
        shutdown.clone(),
        move || sweep_governance(&c),
    ));

    let c = ctx.clone();
    tasks.push(PeriodicTask::spawn(
        "dag-sync",
        DAG_SYNC_INTERVAL,
        shutdown,
        move || sync_dag(&c),
    ));

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hyperchain_consensus::{GovernanceApi, ProposalAction};
    use hyperchain_core::{
        Clock, ExternalMetrics, GithubContributions, ManualClock, NetworkProbe, NullOracle,
        QualityOracle, Transaction, TransactionSource,
    };
    use hyperchain_reputation::MetricType;

    use crate::collaborators::{LoggingBroadcaster, StaticProbe};
    use crate::config::{DaemonConfig, LocalValidator};

    struct CommitOracle;

    impl QualityOracle for CommitOracle {
        fn fetch(&self, _address: &str, _identity: &str) -> ExternalMetrics {
            ExternalMetrics {
                github: Some(GithubContributions {
                    lines_added: 100,
                    lines_removed: 0,
                    commit_count: 3,
                }),
                forum: None,
            }
        }
    }

    struct OfflineProbe;

    impl NetworkProbe for OfflineProbe {
        fn is_online(&self, address: &str) -> bool {
            address != "val2"
        }
        fn peers_connected(&self) -> u32 {
            0
        }
        fn bandwidth(&self) -> f64 {
            0.0
        }
    }

    fn local(address: &str, identity: Option<&str>) -> LocalValidator {
        LocalValidator {
            address: address.to_string(),
            stake: 200_000,
            identity: identity.map(str::to_string),
        }
    }

    fn context(
        oracle: Arc<dyn QualityOracle>,
        probe: Arc<dyn NetworkProbe>,
    ) -> (NodeContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
        let config = DaemonConfig {
            validators: vec![local("val1", Some("octocat")), local("val2", None)],
            ..DaemonConfig::default()
        };
        let ctx = NodeContext::new(config, clock.clone(), oracle, probe, Arc::new(LoggingBroadcaster));
        assert_eq!(ctx.enroll_configured(), 2);
        (ctx, clock)
    }

    #[test]
    fn test_produce_block_drains_pool() {
        let (ctx, clock) = context(Arc::new(NullOracle), Arc::new(StaticProbe::default()));
        ctx.pool.add(Transaction::new("a", "b", 1.0, clock.now()));

        produce_block(&ctx).unwrap();
        assert_eq!(ctx.pool.size(), 0);
        let blocks: usize = ctx.coordinator.shard_stats().iter().map(|s| s.block_count).sum();
        assert_eq!(blocks, 1);
        sync_dag(&ctx).unwrap();
    }

    #[test]
    fn test_uptime_marks_offline_validators() {
        let (ctx, _) = context(Arc::new(NullOracle), Arc::new(OfflineProbe));
        check_uptime(&ctx).unwrap();

        assert!(ctx.registry.stats("val1").unwrap().active);
        assert!(!ctx.registry.stats("val2").unwrap().active);
        // One sample at registration, one from the check: 1 of 2 online.
        let last = ctx.reputation.history("val2").pop().unwrap();
        assert_eq!(last.metric_type, MetricType::Uptime);
        assert_eq!(last.value, 0.5);
    }

    #[test]
    fn test_reputation_push_refreshes_oracle_hourly() {
        let (ctx, clock) = context(Arc::new(CommitOracle), Arc::new(StaticProbe::default()));
        let code_count = |ctx: &NodeContext| {
            ctx.reputation
                .history("val1")
                .iter()
                .filter(|m| m.metric_type == MetricType::CodeContribution)
                .count()
        };
        // Imported once at registration.
        assert_eq!(code_count(&ctx), 1);

        let mut push = ReputationPush::default();
        push.tick(&ctx).unwrap();
        assert_eq!(code_count(&ctx), 2);

        clock.advance(chrono::Duration::minutes(1));
        push.tick(&ctx).unwrap();
        assert_eq!(code_count(&ctx), 2);

        clock.advance(chrono::Duration::hours(1));
        push.tick(&ctx).unwrap();
        assert_eq!(code_count(&ctx), 3);

        let health = ctx
            .reputation
            .history("val2")
            .into_iter()
            .filter(|m| m.metric_type == MetricType::NetworkHealth)
            .last()
            .unwrap();
        // 25/50 peers * 0.7 + 500/1000 MB/s * 0.3
        assert!((health.value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_governance_sweep_executes_closed_proposals() {
        let (ctx, clock) = context(Arc::new(NullOracle), Arc::new(StaticProbe::default()));
        let api = GovernanceApi::new(ctx.governance.clone());
        let id = api.create_proposal(
            ProposalAction::NetworkUpgrade {
                version: "1.1".to_string(),
            },
            "Upgrade",
            "",
            "val1",
            Some(chrono::Duration::minutes(5)),
        )
        .unwrap();
        assert!(api.vote_on_proposal(&id, "val1", true));

        sweep_governance(&ctx).unwrap();
        assert!(!ctx.governance.get(&id).unwrap().executed);

        clock.advance(chrono::Duration::minutes(5));
        sweep_governance(&ctx).unwrap();
        assert!(ctx.governance.get(&id).unwrap().executed);
    }

    #[tokio::test]
    async fn test_spawn_all_runs_until_shutdown() {
        let (ctx, _) = context(Arc::new(NullOracle), Arc::new(StaticProbe::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = spawn_all(&ctx, shutdown_rx);
        assert_eq!(tasks.len(), 5);

        tokio::time::sleep(Duration::from_millis(700)).await;
        shutdown_tx.send(true).unwrap();
        for task in tasks {
            task.join().await;
        }
        assert!(ctx.coordinator.ticks() >= 1);
    }
}
