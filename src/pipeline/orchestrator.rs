//! Enrichment orchestrator
//!
//! Turns one image into one [`EnrichedResult`]. Every field comes from the
//! same class index and the same forward pass.

use chrono::Utc;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::classifier::{preprocess, Classifier, Prediction};
use crate::errors::{DetectionError, Result};
use crate::heuristics::{extract_risk_factors, extract_symptoms, split_steps};
use crate::metadata::{AdvisoryRecord, MetadataStore, SupplementRecord};
use crate::persistence::{DetectionContext, DetectionId, DetectionStore};
use crate::pipeline::batch::{BatchItem, BatchOutcome, ItemError};
use crate::pipeline::input::ImageInput;
use crate::risk::RiskLevel;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::labels::{LABEL_SEPARATOR, UNKNOWN_LABEL};
use crate::types::{
    ClassIndex, ClassLabel, DiseaseInfo, EnrichedResult, LabelTable, RiskAssessment,
    SupplementInfo,
};

/// Default upper bound on images per batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Advisory data for a label, without running the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAdvisory {
    pub class_index: ClassIndex,
    pub predicted_class: ClassLabel,
    pub disease_info: DiseaseInfo,
    pub supplement_info: SupplementInfo,
}

/// Outcome of the single save attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveStatus {
    Saved { id: DetectionId },
    Failed { reason: String },
}

/// A result plus what happened when it was persisted. The result survives a
/// failed save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub result: EnrichedResult,
    pub save: SaveStatus,
}

/// Shared, read-only handle built once at startup
pub struct EnrichmentPipeline {
    labels: LabelTable,
    metadata: MetadataStore,
    classifier: RwLock<Option<Arc<dyn Classifier>>>,
    telemetry: Option<TelemetryCollector>,
    max_batch_size: usize,
}

impl EnrichmentPipeline {
    /// Pipeline with no classifier installed
    pub fn new(labels: LabelTable, metadata: MetadataStore) -> Self {
        Self {
            labels,
            metadata,
            classifier: RwLock::new(None),
            telemetry: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_classifier(self, classifier: Arc<dyn Classifier>) -> Self {
        self.install_classifier(classifier);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Install or replace the classifier. Calls already running keep the
    /// model they started with.
    pub fn install_classifier(&self, classifier: Arc<dyn Classifier>) {
        let mut slot = self
            .classifier
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            status = classifier.status(),
            class_count = classifier.class_count(),
            "classifier installed"
        );
        *slot = Some(classifier);
    }

    pub fn has_classifier(&self) -> bool {
        self.current_classifier().is_some()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn current_classifier(&self) -> Option<Arc<dyn Classifier>> {
        self.classifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }

    /// Count an image that never reached the classifier, whether it failed
    /// to read or to decode
    pub fn record_rejection(&self, image: &str, error: &DetectionError) {
        tracing::warn!(image = %image, error = %error, "image rejected");
        self.record(TelemetryEvent::ImageRejected {
            image: image.to_string(),
            reason: error.to_string(),
            timestamp: Instant::now(),
        });
    }

    /// Decode and enrich one encoded image
    pub fn enrich(&self, input: &ImageInput) -> Result<EnrichedResult> {
        let image = match preprocess::decode(&input.name, &input.bytes) {
            Ok(image) => image,
            Err(e) => {
                self.record_rejection(&input.name, &e);
                return Err(e);
            }
        };

        self.enrich_image(&image)
    }

    /// Enrich an already decoded image
    pub fn enrich_image(&self, image: &DynamicImage) -> Result<EnrichedResult> {
        let classifier = self
            .current_classifier()
            .ok_or(DetectionError::ModelUnavailable)?;

        let started = Instant::now();
        let prediction = classifier.classify(image)?;
        self.check_prediction(&prediction, classifier.class_count())?;

        let confidence = prediction.confidence();
        self.record(TelemetryEvent::InferenceCompleted {
            class_index: prediction.index,
            confidence,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });

        Ok(self.assemble(&prediction, classifier.status()))
    }

    fn check_prediction(&self, prediction: &Prediction, class_count: usize) -> Result<()> {
        let len = prediction.probabilities.len();
        if len != class_count {
            return Err(DetectionError::AlignmentMismatch {
                table: "model output".to_string(),
                expected: class_count,
                actual: len,
            });
        }
        if prediction.index >= len {
            return Err(DetectionError::Inference(format!(
                "class index {} outside probability vector of length {}",
                prediction.index, len
            )));
        }
        Ok(())
    }

    fn assemble(&self, prediction: &Prediction, model_status: &str) -> EnrichedResult {
        let index = prediction.index;
        let confidence = prediction.confidence();

        let predicted_class = self
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| ClassLabel::new(UNKNOWN_LABEL));
        let (crop, condition) = predicted_class.split();
        let (crop, condition) = (crop.to_string(), condition.to_string());

        let disease_info = match self.metadata.advisory(index) {
            Some(record) => disease_info(record),
            None => {
                self.degraded("disease_info", index);
                DiseaseInfo::degraded()
            }
        };

        let supplement_info = match self.metadata.supplement(index) {
            Some(record) => supplement_info(record),
            None => {
                self.degraded("supplement_info", index);
                SupplementInfo::none()
            }
        };

        let risk_assessment = RiskAssessment {
            overall_risk: RiskLevel::assess(confidence, &condition),
            risk_factors: disease_info.risk_factors.clone(),
            recommendations: disease_info.solutions.clone(),
        };

        EnrichedResult {
            class_index: index,
            predicted_class,
            crop,
            condition,
            confidence,
            risk_assessment,
            disease_info,
            class_probabilities: self.probability_map(&prediction.probabilities),
            supplement_info,
            model_status: model_status.to_string(),
            created_at: Utc::now(),
        }
    }

    fn degraded(&self, table: &str, index: ClassIndex) {
        tracing::debug!(table, index, "no metadata row, using defaults");
        self.record(TelemetryEvent::MetadataDegraded {
            table: table.to_string(),
            class_index: index,
            timestamp: Instant::now(),
        });
    }

    /// Label -> probability for every labelled index
    fn probability_map(&self, probabilities: &[f32]) -> BTreeMap<String, f32> {
        probabilities
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| self.labels.get(i).map(|label| (label.to_string(), p)))
            .collect()
    }

    /// Enrich several images in order. One bad image never aborts the rest.
    pub fn enrich_batch(&self, inputs: &[ImageInput]) -> Result<Vec<BatchItem>> {
        if inputs.len() > self.max_batch_size {
            return Err(DetectionError::BatchTooLarge {
                count: inputs.len(),
                max: self.max_batch_size,
            });
        }

        Ok(inputs
            .iter()
            .enumerate()
            .map(|(position, input)| {
                let outcome = match self.enrich(input) {
                    Ok(result) => BatchOutcome::Result(Box::new(result)),
                    Err(e) => BatchOutcome::Error(ItemError::new(batch_label(position, input), &e)),
                };
                BatchItem {
                    position,
                    filename: input.name.clone(),
                    outcome,
                }
            })
            .collect())
    }

    /// Advisory data for `crop___condition` without running the model
    pub fn describe(&self, crop: &str, condition: &str) -> Result<ClassAdvisory> {
        let label = format!("{}{}{}", crop, LABEL_SEPARATOR, condition);
        let index = self
            .labels
            .position(&label)
            .ok_or_else(|| DetectionError::UnknownClass(label.clone()))?;

        let disease_info = self
            .metadata
            .advisory(index)
            .map(disease_info)
            .unwrap_or_else(DiseaseInfo::degraded);
        let supplement_info = self
            .metadata
            .supplement(index)
            .map(supplement_info)
            .unwrap_or_else(SupplementInfo::none);

        Ok(ClassAdvisory {
            class_index: index,
            predicted_class: ClassLabel::new(label),
            disease_info,
            supplement_info,
        })
    }

    /// Enrich, then hand the result to `store` exactly once
    pub fn detect_and_save(
        &self,
        input: &ImageInput,
        store: &dyn DetectionStore,
        context: &DetectionContext,
    ) -> Result<DetectionOutcome> {
        let result = self.enrich(input)?;

        let save = match store.save(&result, context) {
            Ok(id) => SaveStatus::Saved { id },
            Err(e) => {
                tracing::warn!(image = %input.name, error = %e, "failed to save detection");
                SaveStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.record(TelemetryEvent::DetectionSaved {
            success: matches!(save, SaveStatus::Saved { .. }),
            timestamp: Instant::now(),
        });

        Ok(DetectionOutcome { result, save })
    }
}

fn batch_label(position: usize, input: &ImageInput) -> String {
    if input.name.is_empty() {
        format!("image #{}", position + 1)
    } else {
        input.name.clone()
    }
}

fn disease_info(record: &AdvisoryRecord) -> DiseaseInfo {
    let (solutions, prevention) = split_steps(&record.possible_steps);
    DiseaseInfo {
        description: record.description.clone(),
        symptoms: extract_symptoms(&record.description),
        solutions,
        prevention,
        risk_factors: extract_risk_factors(&record.disease_name),
    }
}

fn supplement_info(record: &SupplementRecord) -> SupplementInfo {
    SupplementInfo {
        name: record.name.clone(),
        image_url: record.image_url.clone(),
        buy_link: record.buy_link.clone(),
    }
}
