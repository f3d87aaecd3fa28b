// crates/hyperchain-reputation/src/lib.rs
//
// hyperchain-reputation: Multi-metric quality scoring for the Hyperchain
// DPoQS ledger.
//
// Every validator accumulates timestamped quality observations (uptime,
// block quality, governance participation, code contribution, community,
// network health). The engine folds the last 24 hours of observations into a
// single score in [0, 1] using per-type weights that governance can change.

pub mod engine;
pub mod metric;
pub mod uptime;
pub mod weights;

pub use engine::{ReputationEngine, SCORE_WINDOW_HOURS};
pub use metric::{MetricSource, MetricType, QualityMetric};
pub use uptime::{UptimeWindow, UPTIME_WINDOW_CAPACITY};
pub use weights::MetricWeights;
