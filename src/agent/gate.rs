//! Decides whether a measured height is worth posting.

use super::policy::AgentPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Post(u32),
    /// Equal to the last successfully posted height.
    Duplicate,
    /// Not finite or not strictly positive.
    Invalid,
    /// Suspiciously large jump still waiting for confirmation.
    Deferred { streak: u32, needed: u32 },
}

#[derive(Debug, Clone)]
pub struct PostGate {
    last_posted: Option<u32>,
    suspect_streak: u32,
    ceiling: u32,
    confirmations: u32,
}

impl PostGate {
    pub fn new(policy: &AgentPolicy) -> Self {
        Self {
            last_posted: None,
            suspect_streak: 0,
            ceiling: policy.anomaly_ceiling_px,
            confirmations: policy.confirmations(),
        }
    }

    pub fn last_posted(&self) -> Option<u32> {
        self.last_posted
    }

    pub fn admit(&mut self, candidate: f64) -> GateDecision {
        if !candidate.is_finite() || candidate <= 0.0 {
            return GateDecision::Invalid;
        }
        let height = candidate.ceil().min(u32::MAX as f64) as u32;

        if self.last_posted == Some(height) {
            self.suspect_streak = 0;
            return GateDecision::Duplicate;
        }

        // Only a jump from below the ceiling is suspect; content already known
        // to be that tall may keep growing.
        let jumped = height >= self.ceiling && self.last_posted.is_none_or(|p| p < self.ceiling);
        if jumped {
            self.suspect_streak += 1;
            if self.suspect_streak < self.confirmations {
                return GateDecision::Deferred {
                    streak: self.suspect_streak,
                    needed: self.confirmations,
                };
            }
        }
        self.suspect_streak = 0;
        GateDecision::Post(height)
    }

    /// Record a post that actually went out.
    pub fn mark_posted(&mut self, height: u32) {
        self.last_posted = Some(height);
    }

    pub fn forget_last_posted(&mut self) {
        self.last_posted = None;
    }
}
