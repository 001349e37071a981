//! Persistence boundary
//!
//! A finished [`EnrichedResult`] plus caller context goes in, an opaque id
//! comes out. The pipeline never reads a saved detection back; history and
//! stats exist for the CLI.

pub mod json_store;

pub use json_store::{JsonFileStore, StoreConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Result;
use crate::types::EnrichedResult;

/// Model version recorded with every saved detection
pub const MODEL_VERSION: &str = "1.0.0";

/// Opaque identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(String);

impl DetectionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DetectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub rainfall: Option<f64>,
    pub growth_stage: Option<String>,
}

impl WeatherSnapshot {
    pub fn is_empty(&self) -> bool {
        self.humidity.is_none()
            && self.temperature.is_none()
            && self.rainfall.is_none()
            && self.growth_stage.is_none()
    }
}

/// Caller-supplied context stored alongside a result. Passed through
/// without validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionContext {
    pub user_id: Option<String>,
    pub crop_id: Option<String>,
    pub image_ref: Option<String>,
    pub location: Option<GeoPoint>,
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity stored with a detection: very confident blight or rot is
    /// high, low confidence is low, everything else medium
    pub fn classify(confidence: f32, condition: &str) -> Self {
        let condition = condition.to_lowercase();
        if confidence > 0.9 {
            if condition.contains("blight") || condition.contains("rot") {
                Severity::High
            } else {
                Severity::Medium
            }
        } else if confidence < 0.6 {
            Severity::Low
        } else {
            Severity::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    Healthy,
    Detected,
}

impl DetectionStatus {
    pub fn from_condition(condition: &str) -> Self {
        let condition = condition.to_lowercase();
        if condition == "healthy" || condition == "no disease" {
            DetectionStatus::Healthy
        } else {
            DetectionStatus::Detected
        }
    }
}

/// What a store keeps for one detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDetection {
    pub id: DetectionId,
    pub result: EnrichedResult,
    pub context: DetectionContext,
    pub severity: Severity,
    pub status: DetectionStatus,
    pub model_version: String,
    pub saved_at: DateTime<Utc>,
}

impl PersistedDetection {
    pub fn new(result: EnrichedResult, context: DetectionContext) -> Self {
        let severity = Severity::classify(result.confidence, &result.condition);
        let status = DetectionStatus::from_condition(&result.condition);
        Self {
            id: DetectionId::generate(),
            result,
            context,
            severity,
            status,
            model_version: MODEL_VERSION.to_string(),
            saved_at: Utc::now(),
        }
    }
}

/// History row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub id: DetectionId,
    pub predicted_disease: String,
    pub confidence: f32,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl From<&PersistedDetection> for DetectionSummary {
    fn from(detection: &PersistedDetection) -> Self {
        Self {
            id: detection.id.clone(),
            predicted_disease: detection.result.predicted_class.to_string(),
            confidence: detection.result.confidence,
            severity: detection.severity,
            created_at: detection.saved_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_detections: usize,
    pub high_cases: usize,
    pub avg_confidence: Option<f64>,
    /// Only reported for global stats
    pub total_users: Option<usize>,
}

/// Storage collaborator for finished detections
pub trait DetectionStore: Send + Sync {
    /// Store one detection. Called at most once per result.
    fn save(&self, result: &EnrichedResult, context: &DetectionContext) -> Result<DetectionId>;

    /// A user's detections, newest first
    fn history(&self, user_id: &str, limit: usize) -> Result<Vec<DetectionSummary>>;

    /// Aggregate stats for one user, or for everyone
    fn stats(&self, user_id: Option<&str>) -> Result<DetectionStats>;
}
