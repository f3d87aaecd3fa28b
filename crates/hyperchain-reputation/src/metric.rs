// crates/hyperchain-reputation/src/metric.rs
//
// Quality metric types: a single timestamped observation feeding the
// reputation aggregate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six quality dimensions a validator is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Rolling online ratio over recent liveness samples.
    Uptime,
    /// Acceptance and propagation speed of produced blocks.
    BlockQuality,
    /// Participation in governance votes.
    Governance,
    /// Off-chain code contributions.
    CodeContribution,
    /// Off-chain community participation.
    Community,
    /// Peer connectivity and bandwidth.
    NetworkHealth,
}

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::Uptime,
        MetricType::BlockQuality,
        MetricType::Governance,
        MetricType::CodeContribution,
        MetricType::Community,
        MetricType::NetworkHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Uptime => "uptime",
            MetricType::BlockQuality => "block_quality",
            MetricType::Governance => "governance",
            MetricType::CodeContribution => "code_contribution",
            MetricType::Community => "community",
            MetricType::NetworkHealth => "network_health",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// Measured by the node itself.
    System,
    /// Imported from an off-chain quality oracle.
    Oracle,
    /// Derived from governance voting.
    Voting,
    /// Recorded as part of a slashing event.
    Penalty,
}

/// A single immutable quality observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetric {
    pub metric_type: MetricType,
    /// Observation value in [0.0, 1.0].
    pub value: f64,
    /// Weight of `metric_type` at the time of recording. Informational only:
    /// scoring always uses the current weight map.
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
    pub source: MetricSource,
}

impl QualityMetric {
    /// Build a metric. Values are clamped to [0.0, 1.0]; non-finite values
    /// become 0.0.
    pub fn new(
        metric_type: MetricType,
        value: f64,
        weight: f64,
        timestamp: DateTime<Utc>,
        source: MetricSource,
    ) -> Self {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            metric_type,
            value,
            weight,
            timestamp,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_clamped() {
        let now = Utc::now();
        let high = QualityMetric::new(MetricType::Community, 1.7, 0.1, now, MetricSource::Oracle);
        assert_eq!(high.value, 1.0);

        let low = QualityMetric::new(MetricType::Community, -0.3, 0.1, now, MetricSource::Oracle);
        assert_eq!(low.value, 0.0);

        let nan = QualityMetric::new(MetricType::Uptime, f64::NAN, 0.25, now, MetricSource::System);
        assert_eq!(nan.value, 0.0);
    }

    #[test]
    fn test_metric_type_names() {
        assert_eq!(MetricType::BlockQuality.to_string(), "block_quality");
        assert_eq!(MetricType::ALL.len(), 6);
    }
}
