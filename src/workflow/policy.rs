use crate::admin::AdminCapability;
use crate::evidence::Verdict;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("threshold must be between 0 and 10, got {0}")]
    ThresholdOutOfRange(f32),
}

/// Process-wide passing threshold, adjustable only with an admin capability.
#[derive(Debug)]
pub struct ScoringPolicy {
    threshold: RwLock<f32>,
}

impl ScoringPolicy {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: RwLock::new(threshold.clamp(0.0, 10.0)),
        }
    }

    pub fn threshold(&self) -> f32 {
        *self.threshold.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the previous threshold.
    pub fn set_threshold(&self, _cap: &AdminCapability, value: f32) -> Result<f32, PolicyError> {
        if !value.is_finite() || !(0.0..=10.0).contains(&value) {
            return Err(PolicyError::ThresholdOutOfRange(value));
        }
        let mut guard = self.threshold.write().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::replace(&mut *guard, value))
    }

    /// The evaluator's own pass flag is necessary but not sufficient.
    pub fn is_passing(&self, verdict: &Verdict) -> bool {
        verdict.passed && verdict.score >= self.threshold()
    }
}
