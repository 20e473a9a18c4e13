//! Tunable measurement policy shared by the injected script and the Rust session.

use serde::{Deserialize, Serialize};

/// Global key the session object is stored under in the document.
pub const SESSION_KEY: &str = "__webviewAutoHeight";

/// Bare control payload asking the agent to re-measure.
pub const REFRESH_SENTINEL: &str = "__AUTOHEIGHT_REFRESH__";

/// Delay used for a measurement pass when the document has no frame callback.
pub const FRAME_FALLBACK_MS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPolicy {
    /// Mutation cooldown while media loads are still in flight.
    pub mutation_cooldown_busy_ms: u32,
    /// Mutation cooldown once no media is pending.
    pub mutation_cooldown_idle_ms: u32,
    pub fallback_initial_ms: u32,
    pub fallback_growth: f64,
    pub fallback_max_ms: u32,
    /// Offsets after bootstrap at which a measurement is forced regardless of observers.
    pub forced_remeasure_ms: Vec<u32>,
    /// Heights at or above this are treated as suspect until confirmed.
    pub anomaly_ceiling_px: u32,
    /// Consecutive suspect measurements needed before one is posted.
    pub anomaly_confirmations: u32,
}

impl Default for AgentPolicy {
    fn default() -> Self {
        Self {
            mutation_cooldown_busy_ms: 32,
            mutation_cooldown_idle_ms: 120,
            fallback_initial_ms: 400,
            fallback_growth: 2.0,
            fallback_max_ms: 8000,
            forced_remeasure_ms: vec![50, 150, 300, 600, 1000, 2000, 3500],
            anomaly_ceiling_px: 50_000,
            anomaly_confirmations: 3,
        }
    }
}

impl AgentPolicy {
    pub fn mutation_cooldown_ms(&self, media_in_flight: usize) -> u32 {
        if media_in_flight > 0 {
            self.mutation_cooldown_busy_ms
        } else {
            self.mutation_cooldown_idle_ms
        }
    }

    /// Delay for the fallback timer armed after one that waited `current_ms`.
    pub fn next_fallback_ms(&self, current_ms: u32) -> u32 {
        let growth = if self.fallback_growth.is_finite() && self.fallback_growth >= 1.0 {
            self.fallback_growth
        } else {
            1.0
        };
        let grown = (current_ms.max(1) as f64 * growth).ceil();
        if grown >= self.fallback_max_ms as f64 {
            self.fallback_max_ms
        } else {
            grown as u32
        }
    }

    /// Confirmation count, never below one.
    pub fn confirmations(&self) -> u32 {
        self.anomaly_confirmations.max(1)
    }
}
