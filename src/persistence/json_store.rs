//! JSON file detection store
//!
//! One `detection_<id>.json` file per saved detection in a single directory.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{DetectionError, Result};
use crate::persistence::{
    DetectionContext, DetectionId, DetectionStats, DetectionStore, DetectionSummary,
    PersistedDetection, Severity,
};
use crate::types::EnrichedResult;

const FILE_PREFIX: &str = "detection_";
const FILE_SUFFIX: &str = ".json";

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding detection files
    pub storage_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let storage_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agridoctor")
            .join("detections");

        Self { storage_dir }
    }
}

fn persistence_error(action: &str, path: &Path, err: impl std::fmt::Display) -> DetectionError {
    DetectionError::Persistence(format!("{} {}: {}", action, path.display(), err))
}

/// Detection store backed by JSON files
pub struct JsonFileStore {
    config: StoreConfig,
}

impl JsonFileStore {
    /// Create the store, creating its directory if needed
    pub fn new(config: StoreConfig) -> Result<Self> {
        if !config.storage_dir.exists() {
            fs::create_dir_all(&config.storage_dir)
                .map_err(|e| persistence_error("Failed to create", &config.storage_dir, e))?;
        }

        Ok(Self { config })
    }

    pub fn open(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig {
            storage_dir: storage_dir.into(),
        })
    }

    fn detection_path(&self, id: &str) -> PathBuf {
        self.config
            .storage_dir
            .join(format!("{}{}{}", FILE_PREFIX, id, FILE_SUFFIX))
    }

    /// Load one detection by id
    pub fn load(&self, id: &DetectionId) -> Result<PersistedDetection> {
        let path = self.detection_path(id.as_str());
        let json = fs::read_to_string(&path).map_err(|e| persistence_error("Failed to read", &path, e))?;
        serde_json::from_str(&json).map_err(|e| persistence_error("Failed to parse", &path, e))
    }

    /// All saved detection ids
    pub fn list(&self) -> Result<Vec<DetectionId>> {
        if !self.config.storage_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.config.storage_dir)
            .map_err(|e| persistence_error("Failed to list", &self.config.storage_dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if let Some(id) = filename
                    .strip_prefix(FILE_PREFIX)
                    .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                {
                    ids.push(DetectionId::from(id.to_string()));
                }
            }
        }

        Ok(ids)
    }

    /// Every readable detection; unreadable files are skipped with a warning
    pub fn load_all(&self) -> Result<Vec<PersistedDetection>> {
        let mut detections = Vec::new();
        for id in self.list()? {
            match self.load(&id) {
                Ok(detection) => detections.push(detection),
                Err(e) => tracing::warn!(id = %id, error = %e, "skipping unreadable detection"),
            }
        }
        Ok(detections)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }
}

impl DetectionStore for JsonFileStore {
    fn save(&self, result: &EnrichedResult, context: &DetectionContext) -> Result<DetectionId> {
        let detection = PersistedDetection::new(result.clone(), context.clone());
        let path = self.detection_path(detection.id.as_str());

        let json = serde_json::to_string_pretty(&detection)?;
        fs::write(&path, json).map_err(|e| persistence_error("Failed to write", &path, e))?;

        tracing::info!(id = %detection.id, class = %result.predicted_class, "detection saved");
        Ok(detection.id)
    }

    fn history(&self, user_id: &str, limit: usize) -> Result<Vec<DetectionSummary>> {
        let mut detections: Vec<PersistedDetection> = self
            .load_all()?
            .into_iter()
            .filter(|d| d.context.user_id.as_deref() == Some(user_id))
            .collect();

        detections.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

        Ok(detections
            .iter()
            .take(limit)
            .map(DetectionSummary::from)
            .collect())
    }

    fn stats(&self, user_id: Option<&str>) -> Result<DetectionStats> {
        let detections: Vec<PersistedDetection> = self
            .load_all()?
            .into_iter()
            .filter(|d| match user_id {
                Some(user) => d.context.user_id.as_deref() == Some(user),
                None => true,
            })
            .collect();

        if detections.is_empty() {
            return Ok(DetectionStats {
                total_users: user_id.is_none().then_some(0),
                ..Default::default()
            });
        }

        let total = detections.len();
        let confidence_sum: f64 = detections.iter().map(|d| d.result.confidence as f64).sum();
        let high_cases = detections
            .iter()
            .filter(|d| d.severity == Severity::High)
            .count();

        let total_users = user_id.is_none().then(|| {
            detections
                .iter()
                .filter_map(|d| d.context.user_id.as_deref())
                .collect::<HashSet<_>>()
                .len()
        });

        Ok(DetectionStats {
            total_detections: total,
            high_cases,
            avg_confidence: Some(confidence_sum / total as f64),
            total_users,
        })
    }
}
