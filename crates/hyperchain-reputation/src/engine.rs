// crates/hyperchain-reputation/src/engine.rs
//
// Reputation engine: per-validator metric history and the weighted,
// presence-normalized aggregate score.
//
// Scoring, run on every recorded metric:
//   1. keep the validator's metrics from the trailing 24 hours;
//   2. average the values of each metric type present;
//   3. weighted-sum the per-type averages with the current weight map;
//   4. divide by the summed weights of the types that actually have data.
//
// Step 4 means a validator with no code-contribution data is not dragged
// toward zero on that dimension. An empty window scores exactly 0.
//
// Only metrics inside the window are retained. They are kept ordered by
// timestamp next to running per-type totals, so an insertion expires old
// entries from the front and rescores in time proportional to the number of
// metric types, not the length of the history.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use hyperchain_core::{Address, Clock, SystemClock};

use crate::metric::{MetricSource, MetricType, QualityMetric};
use crate::uptime::UptimeWindow;
use crate::weights::MetricWeights;

/// Length of the trailing scoring window.
pub const SCORE_WINDOW_HOURS: i64 = 24;

/// Quality value of a penalty record.
const PENALTY_QUALITY: f64 = 0.1;

/// Sum and count of one metric type's values inside the window.
#[derive(Debug, Default, Clone, Copy)]
struct TypeTotal {
    sum: f64,
    count: usize,
}

#[derive(Debug, Default)]
struct ReputationState {
    /// Metrics inside the scoring window, oldest first.
    metrics: VecDeque<QualityMetric>,
    totals: BTreeMap<MetricType, TypeTotal>,
    uptime: UptimeWindow,
    score: f64,
}

impl ReputationState {
    fn append(&mut self, metric: QualityMetric, weights: &MetricWeights, now: DateTime<Utc>) {
        let total = self.totals.entry(metric.metric_type).or_default();
        total.sum += metric.value;
        total.count += 1;

        // Engine-stamped metrics arrive in clock order and land at the back.
        let at = self.metrics.partition_point(|m| m.timestamp <= metric.timestamp);
        self.metrics.insert(at, metric);
        self.rescore(weights, now);
    }

    fn rescore(&mut self, weights: &MetricWeights, now: DateTime<Utc>) {
        self.expire(window_start(now));
        self.score = score_totals(&self.totals, weights);
    }

    fn expire(&mut self, cutoff: DateTime<Utc>) {
        while self.metrics.front().is_some_and(|m| m.timestamp < cutoff) {
            let Some(old) = self.metrics.pop_front() else {
                break;
            };
            if let Some(total) = self.totals.get_mut(&old.metric_type) {
                total.count -= 1;
                total.sum -= old.value;
                if total.count == 0 {
                    self.totals.remove(&old.metric_type);
                }
            }
        }
    }
}

fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(SCORE_WINDOW_HOURS)
}

/// Aggregate `metrics` into a score in [0.0, 1.0].
pub fn compute_score(metrics: &[QualityMetric], weights: &MetricWeights, now: DateTime<Utc>) -> f64 {
    let cutoff = window_start(now);

    let mut totals: BTreeMap<MetricType, TypeTotal> = BTreeMap::new();
    for metric in metrics.iter().filter(|m| m.timestamp >= cutoff) {
        let total = totals.entry(metric.metric_type).or_default();
        total.sum += metric.value;
        total.count += 1;
    }
    score_totals(&totals, weights)
}

fn score_totals(totals: &BTreeMap<MetricType, TypeTotal>, weights: &MetricWeights) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (metric_type, total) in totals {
        let weight = weights.get(*metric_type);
        weighted_sum += (total.sum / total.count as f64) * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Stores metric histories and scores for every validator.
///
/// Each validator's state sits in its own map entry, so recording for one
/// validator never blocks another; append and recompute for the same
/// validator happen under that entry's lock.
#[derive(Debug)]
pub struct ReputationEngine {
    states: DashMap<Address, ReputationState>,
    weights: RwLock<MetricWeights>,
    clock: Arc<dyn Clock>,
}

impl Default for ReputationEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ReputationEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            states: DashMap::new(),
            weights: RwLock::new(MetricWeights::default()),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Append `metric` to the validator's history and recompute its score.
    pub fn record(&self, address: &str, metric: QualityMetric) {
        let weights = self.weights.read().clone();
        let now = self.clock.now();
        let mut state = self.states.entry(address.to_string()).or_default();
        state.append(metric, &weights, now);
    }

    /// Build a metric of `metric_type` stamped with the current time and
    /// weight, then record it.
    fn record_value(&self, address: &str, metric_type: MetricType, value: f64, source: MetricSource) {
        let weight = self.weights.read().get(metric_type);
        let metric = QualityMetric::new(metric_type, value, weight, self.clock.now(), source);
        self.record(address, metric);
    }

    /// Push a liveness sample and record the rolling online ratio as an
    /// UPTIME metric.
    pub fn uptime(&self, address: &str, online: bool) {
        let weights = self.weights.read().clone();
        let now = self.clock.now();
        let mut state = self.states.entry(address.to_string()).or_default();
        let ratio = state.uptime.push(online);
        let metric = QualityMetric::new(
            MetricType::Uptime,
            ratio,
            weights.get(MetricType::Uptime),
            now,
            MetricSource::System,
        );
        state.append(metric, &weights, now);
    }

    /// Record the quality of a produced block: 0.8 if accepted, 0.2 if not,
    /// scaled down by slow propagation (`min(1, 1 / (t + 0.1))`).
    pub fn block_quality(&self, address: &str, block_id: &str, accepted: bool, propagation_time: f64) {
        let value = block_quality_value(accepted, propagation_time);
        tracing::trace!(
            "Block quality for {} on {}: accepted={} value={:.3}",
            address,
            block_id,
            accepted,
            value
        );
        self.record_value(address, MetricType::BlockQuality, value, MetricSource::System);
    }

    /// Record a slashing event as a strongly negative block-quality metric.
    pub fn penalty(&self, address: &str) {
        self.record_value(address, MetricType::BlockQuality, PENALTY_QUALITY, MetricSource::Penalty);
    }

    pub fn governance_participation(&self, address: &str, proposal_id: &str, voted: bool) {
        tracing::trace!("Governance participation for {} on {}: {}", address, proposal_id, voted);
        let value = if voted { 1.0 } else { 0.0 };
        self.record_value(address, MetricType::Governance, value, MetricSource::Voting);
    }

    /// `min(1, (added + removed) / 1000)`, doubled for core contributions
    /// and clamped back to 1.
    pub fn code_contribution(&self, address: &str, lines_added: u64, lines_removed: u64, is_core: bool) {
        let mut value = ((lines_added + lines_removed) as f64 / 1000.0).min(1.0);
        if is_core {
            value *= 2.0;
        }
        self.record_value(address, MetricType::CodeContribution, value.min(1.0), MetricSource::Oracle);
    }

    pub fn community(&self, address: &str, help_score: f64, content_quality: f64) {
        let value = help_score * 0.6 + content_quality * 0.4;
        self.record_value(address, MetricType::Community, value, MetricSource::Oracle);
    }

    /// Up to 50 peers count fully (70%), up to 1000 MB/s of bandwidth
    /// counts fully (30%).
    pub fn network_health(&self, address: &str, peers_connected: u32, bandwidth: f64) {
        let peers = (peers_connected as f64 / 50.0).min(1.0);
        let bandwidth = (bandwidth.max(0.0) / 1000.0).min(1.0);
        let value = peers * 0.7 + bandwidth * 0.3;
        self.record_value(address, MetricType::NetworkHealth, value, MetricSource::System);
    }

    /// Last computed score; 0.0 for validators with no history.
    pub fn score(&self, address: &str) -> f64 {
        self.states.get(address).map(|s| s.score).unwrap_or(0.0)
    }

    /// The `n` best-scored validators, highest first. Equal scores are
    /// ordered by address.
    pub fn top(&self, n: usize) -> Vec<(Address, f64)> {
        let mut scored: Vec<(Address, f64)> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), entry.score))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }

    pub fn weights(&self) -> MetricWeights {
        self.weights.read().clone()
    }

    /// Merge a partial weight update and rescore every validator against
    /// the new weights. Returns the metric types whose weight was rejected.
    pub fn update_weights(&self, update: &BTreeMap<MetricType, f64>) -> Vec<MetricType> {
        let (weights, rejected) = {
            let mut weights = self.weights.write();
            let rejected = weights.merge(update);
            (weights.clone(), rejected)
        };
        if !rejected.is_empty() {
            tracing::warn!("Ignoring invalid reputation weights for {:?}", rejected);
        }

        let now = self.clock.now();
        for mut entry in self.states.iter_mut() {
            entry.rescore(&weights, now);
        }
        tracing::info!("Reputation weights updated: {:?}", update);
        rejected
    }

    /// Snapshot of the validator's metrics inside the scoring window, oldest
    /// first. Older metrics are dropped as new ones arrive.
    pub fn history(&self, address: &str) -> Vec<QualityMetric> {
        self.states
            .get(address)
            .map(|s| s.metrics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn metric_count(&self, address: &str) -> usize {
        self.states.get(address).map(|s| s.metrics.len()).unwrap_or(0)
    }

    /// Addresses with any recorded history.
    pub fn validators(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.states.iter().map(|e| e.key().clone()).collect();
        addresses.sort();
        addresses
    }
}

/// Quality value of a produced block.
pub fn block_quality_value(accepted: bool, propagation_time: f64) -> f64 {
    let base = if accepted { 0.8 } else { 0.2 };
    let propagation_time = if propagation_time.is_finite() { propagation_time.max(0.0) } else { f64::MAX };
    base * (1.0 / (propagation_time + 0.1)).min(1.0)
}
