// crates/hyperchain-daemon/src/config.rs
//
// Runtime configuration for the Hyperchain daemon.
// Loaded from a TOML file or populated with sensible defaults. Values that
// would break the node (zero shards, non-positive block time, ...) are reset
// to their default with a warning.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use hyperchain_consensus::CoordinatorConfig;
use hyperchain_economics::SignaturePenalties;

/// Longest accepted block time, in seconds.
pub const MAX_BLOCK_TIME_SECS: f64 = 3600.0;

/// Longest accepted reputation push interval, in seconds.
pub const MAX_REPUTATION_UPDATE_INTERVAL_SECS: u64 = 86_400;

/// A validator operated by this node. Keys are generated at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalValidator {
    pub address: String,
    pub stake: u64,
    /// External identity handle for quality oracles.
    #[serde(default)]
    pub identity: Option<String>,
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Throughput target in transactions per second. Informational.
    #[serde(default = "default_tps_target")]
    pub tps_target: u64,

    /// Seconds between block production attempts.
    #[serde(default = "default_block_time")]
    pub block_time: f64,

    /// Number of DAG shards.
    #[serde(default = "default_sharding_factor")]
    pub sharding_factor: u32,

    /// Minimum stake accepted at registration.
    #[serde(default = "default_min_stake")]
    pub min_stake: u64,

    /// Port for peer communication.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_validators")]
    pub max_validators: usize,

    /// Seconds between reputation pushes.
    #[serde(default = "default_reputation_update_interval")]
    pub reputation_update_interval: u64,

    /// Transactions per block.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Every block is signed with each of these algorithms.
    #[serde(default = "default_signature_algorithms")]
    pub signature_algorithms: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-algorithm severity overrides for invalid block signatures,
    /// e.g. `[signature_penalties]` with `ed25519 = 0.15`.
    #[serde(default)]
    pub signature_penalties: BTreeMap<String, f64>,

    /// Validators registered and operated by this node.
    #[serde(default)]
    pub validators: Vec<LocalValidator>,
}

fn default_tps_target() -> u64 {
    5_000_000
}

fn default_block_time() -> f64 {
    0.5
}

fn default_sharding_factor() -> u32 {
    4
}

fn default_min_stake() -> u64 {
    100_000
}

fn default_port() -> u16 {
    8000
}

fn default_max_validators() -> usize {
    100
}

fn default_reputation_update_interval() -> u64 {
    60
}

fn default_batch_size() -> usize {
    10
}

fn default_signature_algorithms() -> Vec<String> {
    vec!["ed25519".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tps_target: default_tps_target(),
            block_time: default_block_time(),
            sharding_factor: default_sharding_factor(),
            min_stake: default_min_stake(),
            port: default_port(),
            max_validators: default_max_validators(),
            reputation_update_interval: default_reputation_update_interval(),
            batch_size: default_batch_size(),
            signature_algorithms: default_signature_algorithms(),
            log_level: default_log_level(),
            signature_penalties: BTreeMap::new(),
            validators: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Reset every invalid field to its default, logging a warning for each.
    pub fn validated(mut self) -> Self {
        if self.sharding_factor == 0 {
            tracing::warn!("sharding_factor must be at least 1, using {}", default_sharding_factor());
            self.sharding_factor = default_sharding_factor();
        }
        let block_time_ok = self.block_time > 0.0
            && self.block_time <= MAX_BLOCK_TIME_SECS
            && Duration::try_from_secs_f64(self.block_time).is_ok();
        if !block_time_ok {
            tracing::warn!(
                "block_time must be in (0, {}], using {}",
                MAX_BLOCK_TIME_SECS,
                default_block_time()
            );
            self.block_time = default_block_time();
        }
        if self.batch_size == 0 {
            tracing::warn!("batch_size must be at least 1, using {}", default_batch_size());
            self.batch_size = default_batch_size();
        }
        if self.reputation_update_interval == 0
            || self.reputation_update_interval > MAX_REPUTATION_UPDATE_INTERVAL_SECS
        {
            tracing::warn!(
                "reputation_update_interval must be in [1, {}], using {}",
                MAX_REPUTATION_UPDATE_INTERVAL_SECS,
                default_reputation_update_interval()
            );
            self.reputation_update_interval = default_reputation_update_interval();
        }
        if self.signature_algorithms.is_empty() {
            tracing::warn!("signature_algorithms is empty, using {:?}", default_signature_algorithms());
            self.signature_algorithms = default_signature_algorithms();
        }
        if self.max_validators == 0 {
            tracing::warn!("max_validators must be at least 1, using {}", default_max_validators());
            self.max_validators = default_max_validators();
        }
        self.signature_penalties.retain(|algorithm, severity| {
            let ok = (0.0..=1.0).contains(&*severity);
            if !ok {
                tracing::warn!("Ignoring {} penalty {}: severity must be in [0, 1]", algorithm, severity);
            }
            ok
        });
        self
    }

    /// Block time as a `Duration`. Falls back to the default block time if
    /// the configured value was never validated and is out of range.
    pub fn block_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.block_time)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_block_time()))
    }

    pub fn reputation_interval(&self) -> Duration {
        Duration::from_secs(self.reputation_update_interval)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let penalties = self
            .signature_penalties
            .iter()
            .fold(SignaturePenalties::default(), |penalties, (algorithm, severity)| {
                penalties.with_severity(algorithm.clone(), *severity)
            });
        CoordinatorConfig {
            batch_size: self.batch_size,
            sharding_factor: self.sharding_factor,
            signature_algorithms: self.signature_algorithms.clone(),
            penalties,
        }
    }
}
