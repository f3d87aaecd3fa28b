// crates/hyperchain-daemon/tests/integration.rs
//
// Integration tests for the Hyperchain node.
//
// Exercises the wired-up pipeline: selection, batching, shard storage,
// signing, rewards, block exchange between two nodes, governance effects on
// selection and scoring, and concurrent production.
//
// These tests use the public APIs of the underlying library crates directly
// (hyperchain-consensus, hyperchain-store, hyperchain-reputation,
// hyperchain-core) since the daemon is a binary crate with no lib.rs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use hyperchain_consensus::{
    ConsensusCoordinator, CoordinatorConfig, GovernanceApi, GovernanceEngine, ProposalAction,
    ValidatorRegistry,
};
use hyperchain_core::crypto::ED25519;
use hyperchain_core::{
    BlockHash, ChainError, Clock, CryptoProvider, Ed25519Provider, KeyStore, ManualClock,
    SystemClock, Transaction, TransactionPool, TransactionSource,
};
use hyperchain_economics::block_reward;
use hyperchain_reputation::{MetricType, ReputationEngine};
use hyperchain_store::{BroadcastSink, DagBlock, DagShard};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MIN_STAKE: u64 = 100_000;

/// Broadcast sink that keeps every block it is handed.
#[derive(Default)]
struct CapturingBroadcaster {
    blocks: Mutex<Vec<DagBlock>>,
}

impl BroadcastSink for CapturingBroadcaster {
    fn broadcast(&self, block: &DagBlock) {
        self.blocks.lock().unwrap().push(block.clone());
    }
}

struct Node {
    registry: Arc<ValidatorRegistry>,
    governance: Arc<GovernanceEngine>,
    pool: Arc<TransactionPool>,
    keys: Arc<KeyStore>,
    coordinator: Arc<ConsensusCoordinator>,
    broadcaster: Arc<CapturingBroadcaster>,
}

fn node(clock: Arc<dyn Clock>, sharding_factor: u32) -> Node {
    let reputation = Arc::new(ReputationEngine::new(clock.clone()));
    let registry = Arc::new(ValidatorRegistry::new(MIN_STAKE, 100, reputation, clock.clone()));
    let governance = Arc::new(GovernanceEngine::new(registry.clone(), clock.clone()));
    let pool = Arc::new(TransactionPool::new());
    let keys = Arc::new(KeyStore::new());
    let broadcaster = Arc::new(CapturingBroadcaster::default());
    let config = CoordinatorConfig {
        sharding_factor,
        ..CoordinatorConfig::default()
    };
    let coordinator = Arc::new(ConsensusCoordinator::new(
        config,
        registry.clone(),
        pool.clone(),
        Arc::new(Ed25519Provider),
        keys.clone(),
        broadcaster.clone(),
        clock,
    ));
    Node {
        registry,
        governance,
        pool,
        keys,
        coordinator,
        broadcaster,
    }
}

/// Register `address` on `node` with a fresh local ed25519 key.
fn enroll(node: &Node, address: &str, stake: u64) -> Vec<u8> {
    let publics = node
        .keys
        .generate_for(address, &Ed25519Provider, &[ED25519.to_string()])
        .unwrap();
    node.registry.register(address, stake, None).unwrap();
    let public = publics[ED25519].clone();
    node.registry
        .set_public_key(address, ED25519, public.clone())
        .unwrap();
    public
}

fn fill_pool(pool: &TransactionPool, count: usize) {
    let base = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    for n in 0..count {
        pool.add(Transaction::new(
            format!("sender{}", n),
            "receiver",
            n as f64,
            base + Duration::milliseconds(n as i64),
        ));
    }
}

/// Assert tips == {stored hashes} - {hashes referenced as a parent}.
fn assert_tip_invariant(shard: &DagShard) {
    let blocks = shard.blocks_since(DateTime::<Utc>::MIN_UTC);
    let hashes: BTreeSet<BlockHash> = blocks.iter().map(|b| b.hash().clone()).collect();
    let referenced: BTreeSet<BlockHash> = blocks
        .iter()
        .flat_map(|b| b.previous_hashes().iter().cloned())
        .collect();
    let expected: BTreeSet<BlockHash> = hashes.difference(&referenced).cloned().collect();
    assert_eq!(shard.tips(), expected, "tip invariant broken in shard {}", shard.shard_id());
}

// ---------------------------------------------------------------------------
// Block production
// ---------------------------------------------------------------------------

#[test]
fn test_production_drains_pool_across_shards() {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let n = node(clock.clone(), 4);
    enroll(&n, "val1", MIN_STAKE);
    fill_pool(&n.pool, 55);

    let mut produced = 0;
    let mut rewards = 0;
    while n.pool.size() > 0 {
        let receipt = n.coordinator.produce_block().unwrap().unwrap();
        produced += receipt.transaction_count;
        rewards += receipt.reward;
        clock.advance(Duration::milliseconds(500));
    }

    assert_eq!(produced, 55);
    assert_eq!(rewards, 6 * block_reward(0) + 55);
    assert_eq!(n.registry.stats("val1").unwrap().stake, MIN_STAKE + rewards);

    let stats = n.coordinator.shard_stats();
    assert_eq!(stats.iter().map(|s| s.transaction_count).sum::<usize>(), 55);
    assert_eq!(stats.iter().map(|s| s.block_count).sum::<usize>(), 6);
    for shard in n.coordinator.shards() {
        assert_tip_invariant(shard);
    }
    assert_eq!(n.broadcaster.blocks.lock().unwrap().len(), 6);
}

#[test]
fn test_no_validator_means_no_block() {
    let n = node(Arc::new(SystemClock), 2);
    fill_pool(&n.pool, 3);
    assert_eq!(n.coordinator.produce_block().unwrap(), None);
    assert_eq!(n.pool.size(), 3);
}

#[test]
fn test_reputation_tracks_produced_blocks() {
    let n = node(Arc::new(ManualClock::from_millis(1_700_000_000_000)), 1);
    enroll(&n, "val1", MIN_STAKE);
    n.coordinator.produce_block().unwrap().unwrap();

    let history = n.registry.reputation().history("val1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].metric_type, MetricType::BlockQuality);
    let score = n.registry.reputation().score("val1");
    assert!(score > 0.0 && score <= 1.0);
}

// ---------------------------------------------------------------------------
// Block exchange
// ---------------------------------------------------------------------------

#[test]
fn test_peer_verifies_and_stores_broadcast_blocks() {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let a = node(clock.clone(), 1);
    let b = node(clock.clone(), 1);

    let public = enroll(&a, "val1", MIN_STAKE);
    b.registry.register("val1", MIN_STAKE, None).unwrap();
    b.registry.set_public_key("val1", ED25519, public).unwrap();

    fill_pool(&a.pool, 20);
    a.coordinator.produce_block().unwrap().unwrap();
    clock.advance(Duration::milliseconds(500));
    a.coordinator.produce_block().unwrap().unwrap();

    let sent = a.broadcaster.blocks.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    for block in sent.clone() {
        b.coordinator.verify_incoming(block).unwrap();
    }

    let shard = b.coordinator.shard(0).unwrap();
    assert_eq!(shard.len(), 2);
    assert_eq!(shard.tips(), BTreeSet::from([sent[1].hash().clone()]));
    assert_eq!(b.registry.stats("val1").unwrap().stake, MIN_STAKE);
}

#[test]
fn test_peer_rejects_forged_block_and_slashes_producer() {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let a = node(clock.clone(), 1);
    let b = node(clock.clone(), 1);

    // B knows a different key for val1 than the one A signs with.
    enroll(&a, "val1", MIN_STAKE);
    let other = Ed25519Provider.generate_keypair(ED25519).unwrap();
    b.registry.register("val1", MIN_STAKE, None).unwrap();
    b.registry.set_public_key("val1", ED25519, other.public).unwrap();

    a.coordinator.produce_block().unwrap().unwrap();
    let block = a.broadcaster.blocks.lock().unwrap()[0].clone();

    let err = b.coordinator.verify_incoming(block).unwrap_err();
    assert!(matches!(err, ChainError::VerificationFailure(_)));
    assert!(b.coordinator.shard(0).unwrap().is_empty());
    assert!(b.registry.stats("val1").unwrap().stake < MIN_STAKE);
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

#[test]
fn test_governance_slash_moves_selection() {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let n = node(clock.clone(), 1);
    enroll(&n, "alpha", MIN_STAKE * 10);
    enroll(&n, "beta", MIN_STAKE * 5);
    assert_eq!(n.registry.select().unwrap().address, "alpha");

    let api = GovernanceApi::new(n.governance.clone());
    let id = api.create_proposal(
        ProposalAction::ValidatorSlashing {
            validator: "alpha".to_string(),
            severity: Some(0.9),
            reason: Some("equivocation".to_string()),
        },
        "Slash alpha",
        "Produced conflicting blocks",
        "beta",
        Some(Duration::hours(1)),
    )
    .unwrap();
    assert!(api.vote_on_proposal(&id, "alpha", false));
    for voter in ["beta", "gamma", "delta"] {
        assert!(api.vote_on_proposal(&id, voter, true));
    }

    clock.advance(Duration::hours(1));
    assert_eq!(n.governance.finalize_expired(), vec![id]);
    assert_eq!(n.registry.stats("alpha").unwrap().stake, MIN_STAKE);
    assert_eq!(n.registry.select().unwrap().address, "beta");
}

#[test]
fn test_governance_weight_change_rescores() {
    let clock = Arc::new(ManualClock::from_millis(1_700_000_000_000));
    let n = node(clock.clone(), 1);
    enroll(&n, "val1", MIN_STAKE);
    n.registry.record_block_outcome("val1", "b1", false, 10.0);
    let before = n.registry.reputation().score("val1");

    let id = n.governance.create(
        ProposalAction::ReputationWeights {
            weights: BTreeMap::from([(MetricType::BlockQuality, 0.0)]),
        },
        "Ignore block quality",
        "",
        "val1",
        Duration::minutes(10),
    )
    .unwrap();
    n.governance.vote(&id, "val1", true).unwrap();
    clock.advance(Duration::minutes(10));
    n.governance.finalize_expired();

    // Only uptime and governance carry weight now, both at 1.0.
    let after = n.registry.reputation().score("val1");
    assert!(after > before);
    assert!((after - 1.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_production_loses_nothing() {
    let n = node(Arc::new(SystemClock), 2);
    enroll(&n, "val1", MIN_STAKE);
    enroll(&n, "val2", MIN_STAKE);
    fill_pool(&n.pool, 1_000);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = n.coordinator.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut committed = 0;
            for _ in 0..25 {
                if let Some(receipt) = coordinator.produce_block().unwrap() {
                    committed += receipt.transaction_count;
                }
            }
            committed
        }));
    }

    let mut committed = 0;
    for handle in handles {
        committed += handle.await.unwrap();
    }

    assert_eq!(committed, 1_000);
    assert_eq!(n.pool.size(), 0);

    let mut seen = BTreeSet::new();
    for shard in n.coordinator.shards() {
        assert_tip_invariant(shard);
        for tx in shard.all_transactions() {
            assert!(seen.insert(tx.hash()), "transaction committed twice");
        }
    }
    assert_eq!(seen.len(), 1_000);
}
