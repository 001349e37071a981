//! Risk classification
//!
//! Maps a confidence score and a condition name to a qualitative risk level.
//! Rules are evaluated top to bottom and the first match wins:
//!
//! 1. condition mentions `healthy` -> Low
//! 2. confidence > 0.8 -> High
//! 3. confidence > 0.6 -> Medium
//! 4. otherwise -> Low
//!
//! Both thresholds are exclusive lower bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence strictly above this is High risk
pub const HIGH_RISK_THRESHOLD: f32 = 0.8;

/// Confidence strictly above this is Medium risk
pub const MEDIUM_RISK_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a prediction. `confidence` is expected in `[0, 1]`.
    pub fn assess(confidence: f32, condition: &str) -> Self {
        if condition.to_lowercase().contains("healthy") {
            RiskLevel::Low
        } else if confidence > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if confidence > MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
