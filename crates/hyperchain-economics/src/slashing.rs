// crates/hyperchain-economics/src/slashing.rs
//
// Slashing severities and penalty computation.
//
// Block verification slashes for an invalid block signature. The severity
// depends on the signature algorithm: each algorithm's signature is checked
// independently and any failure is sufficient cause for rejection.
// Governance slashes carry their own severity (default 5%).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity used when a slash does not specify one.
pub const DEFAULT_PENALTY_SEVERITY: f64 = 0.05;

/// Severity for an invalid signature under an algorithm with no explicit
/// entry.
const FALLBACK_SIGNATURE_SEVERITY: f64 = 0.10;

/// Per-algorithm severities for invalid signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignaturePenalties {
    severities: BTreeMap<String, f64>,
    fallback: f64,
}

impl Default for SignaturePenalties {
    fn default() -> Self {
        Self {
            severities: BTreeMap::from([
                ("ed25519".to_string(), 0.10),
                ("sphincs".to_string(), 0.10),
                ("ntru".to_string(), 0.05),
            ]),
            fallback: FALLBACK_SIGNATURE_SEVERITY,
        }
    }
}

impl SignaturePenalties {
    pub fn with_severity(mut self, algorithm: impl Into<String>, severity: f64) -> Self {
        self.severities.insert(algorithm.into(), clamp_severity(severity));
        self
    }

    pub fn severity(&self, algorithm: &str) -> f64 {
        self.severities.get(algorithm).copied().unwrap_or(self.fallback)
    }
}

/// Clamp a severity into [0.0, 1.0]; non-finite values become 0.0.
pub fn clamp_severity(severity: f64) -> f64 {
    if severity.is_finite() {
        severity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Compute the penalty amount for a slash of `severity` against
/// `current_stake`.
///
/// # Returns
/// `floor(current_stake * severity)`. Never exceeds `current_stake`.
pub fn compute_penalty(current_stake: u64, severity: f64) -> u64 {
    let penalty = (current_stake as f64 * clamp_severity(severity)) as u64;
    // Ensure penalty does not exceed current stake
    penalty.min(current_stake)
}
