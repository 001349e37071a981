//! Enriched detection result
//!
//! The aggregate returned by one `enrich` call. Field names follow the JSON
//! payload consumers already expect (`predicted_class`, `risk_assessment`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::risk::RiskLevel;
use crate::types::labels::{ClassIndex, ClassLabel};

/// Description used when the disease table has no row for the class
pub const DEGRADED_DESCRIPTION: &str = "Disease information not available";

/// Supplement name used when the supplement table has no row for the class
pub const NO_SUPPLEMENT: &str = "No supplement recommended";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    pub description: String,
    pub symptoms: Vec<String>,
    pub solutions: Vec<String>,
    pub prevention: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl DiseaseInfo {
    /// Sentinel info for a class without a disease row
    pub fn degraded() -> Self {
        Self {
            description: DEGRADED_DESCRIPTION.to_string(),
            symptoms: Vec::new(),
            solutions: Vec::new(),
            prevention: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.description == DEGRADED_DESCRIPTION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementInfo {
    pub name: String,
    pub image_url: String,
    pub buy_link: String,
}

impl SupplementInfo {
    /// Sentinel info for a class without a supplement row
    pub fn none() -> Self {
        Self {
            name: NO_SUPPLEMENT.to_string(),
            image_url: String::new(),
            buy_link: String::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.name == NO_SUPPLEMENT && self.image_url.is_empty() && self.buy_link.is_empty()
    }
}

/// Fully assembled advisory output for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub class_index: ClassIndex,
    pub predicted_class: ClassLabel,
    pub crop: String,
    pub condition: String,
    pub confidence: f32,
    pub risk_assessment: RiskAssessment,
    pub disease_info: DiseaseInfo,
    pub class_probabilities: BTreeMap<String, f32>,
    pub supplement_info: SupplementInfo,
    pub model_status: String,
    pub created_at: DateTime<Utc>,
}

impl EnrichedResult {
    /// Whether any advisory field fell back to its sentinel
    pub fn is_degraded(&self) -> bool {
        self.disease_info.is_degraded() || self.supplement_info.is_degraded()
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        format!(
            "{} ({:.1}% confidence, {} risk)",
            self.predicted_class,
            self.confidence * 100.0,
            self.risk_assessment.overall_risk
        )
    }
}
