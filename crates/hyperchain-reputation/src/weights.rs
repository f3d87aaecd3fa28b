// crates/hyperchain-reputation/src/weights.rs
//
// Per-type scoring weights. Defaults sum to 1.0, but nothing requires it:
// the engine normalizes by the weights of the types a validator has data for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metric::MetricType;

/// Weight for each metric type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricWeights {
    weights: BTreeMap<MetricType, f64>,
}

impl Default for MetricWeights {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (MetricType::Uptime, 0.25),
            (MetricType::BlockQuality, 0.30),
            (MetricType::Governance, 0.15),
            (MetricType::CodeContribution, 0.10),
            (MetricType::Community, 0.10),
            (MetricType::NetworkHealth, 0.10),
        ]);
        Self { weights }
    }
}

impl MetricWeights {
    /// Weight for `metric_type`; 0.0 if it was never configured.
    pub fn get(&self, metric_type: MetricType) -> f64 {
        self.weights.get(&metric_type).copied().unwrap_or(0.0)
    }

    /// Merge a partial update. Types not present in `update` keep their
    /// weight. Negative or non-finite weights are skipped and returned.
    pub fn merge(&mut self, update: &BTreeMap<MetricType, f64>) -> Vec<MetricType> {
        let mut rejected = Vec::new();
        for (&metric_type, &weight) in update {
            if weight.is_finite() && weight >= 0.0 {
                self.weights.insert(metric_type, weight);
            } else {
                rejected.push(metric_type);
            }
        }
        rejected
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricType, f64)> + '_ {
        self.weights.iter().map(|(&t, &w)| (t, w))
    }
}
