//! Startup wiring for AgriDoctor
//!
//! Loads the label table, both metadata tables and the model once, checks
//! that they agree on the class count, and hands back the shared pipeline.

use std::sync::Arc;

use crate::classifier::CandleClassifier;
use crate::cli::Config;
use crate::errors::{DetectionError, Result};
use crate::metadata::MetadataStore;
use crate::pipeline::EnrichmentPipeline;
use crate::types::LabelTable;

/// Pipeline built in lenient mode, plus why the model is missing if it is
pub struct LenientStart {
    pub pipeline: EnrichmentPipeline,
    pub model_error: Option<DetectionError>,
}

/// Startup builder
pub struct Bootstrap;

impl Bootstrap {
    /// Build the pipeline; any load or alignment problem fails startup
    pub fn from_config(config: &Config) -> Result<EnrichmentPipeline> {
        let pipeline = Self::base_pipeline(config)?;
        let classifier = Self::load_classifier(config)?;
        Ok(pipeline.with_classifier(Arc::new(classifier)))
    }

    /// Build the pipeline even when the model fails to load. Every `enrich`
    /// then fails with `ModelUnavailable` until a classifier is installed.
    pub fn lenient(config: &Config) -> Result<LenientStart> {
        let pipeline = Self::base_pipeline(config)?;
        Ok(Self::attach_classifier(pipeline, config))
    }

    /// Load the model into `pipeline`, keeping a load failure instead of
    /// returning it
    pub fn attach_classifier(pipeline: EnrichmentPipeline, config: &Config) -> LenientStart {
        match Self::load_classifier(config) {
            Ok(classifier) => LenientStart {
                pipeline: pipeline.with_classifier(Arc::new(classifier)),
                model_error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "starting without a classifier");
                LenientStart {
                    pipeline,
                    model_error: Some(e),
                }
            }
        }
    }

    /// Labels and metadata, alignment-checked, with no classifier yet
    pub fn base_pipeline(config: &Config) -> Result<EnrichmentPipeline> {
        let class_count = config.model.class_count;
        let labels = Self::load_labels(config)?;

        let metadata = MetadataStore::load(
            &config.disease_info_path(),
            &config.supplement_info_path(),
        );

        if config.metadata.strict_alignment {
            metadata.check_alignment(class_count)?;
        } else if let Err(e) = metadata.check_alignment(class_count) {
            tracing::warn!(error = %e, "metadata misaligned, continuing");
        }

        Ok(EnrichmentPipeline::new(labels, metadata)
            .with_max_batch_size(config.inference.max_batch_size))
    }

    /// Configured labels file, or the reference labels
    pub fn load_labels(config: &Config) -> Result<LabelTable> {
        let labels = match config.labels_path() {
            Some(path) => LabelTable::load(&path)?,
            None => LabelTable::reference(),
        };

        if labels.len() > config.model.class_count {
            return Err(DetectionError::AlignmentMismatch {
                table: "labels".to_string(),
                expected: config.model.class_count,
                actual: labels.len(),
            });
        }

        Ok(labels)
    }

    pub fn load_classifier(config: &Config) -> Result<CandleClassifier> {
        CandleClassifier::load(
            &config.model_path(),
            config.model.class_count,
            config.model.input_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.model.path = dir.path().join("missing.pt").display().to_string();
        config.metadata.disease_info_path = dir.path().join("disease_info.csv").display().to_string();
        config.metadata.supplement_info_path =
            dir.path().join("supplement_info.csv").display().to_string();
        config
    }

    #[test]
    fn test_strict_requires_model() {
        let dir = TempDir::new().unwrap();
        let err = Bootstrap::from_config(&config(&dir)).err().unwrap();
        assert!(matches!(err, DetectionError::ModelLoad { .. }));
    }

    #[test]
    fn test_lenient_without_model() {
        let dir = TempDir::new().unwrap();
        let start = Bootstrap::lenient(&config(&dir)).unwrap();
        assert!(!start.pipeline.has_classifier());
        assert!(start.model_error.unwrap().is_fatal());
    }

    #[test]
    fn test_short_table_fails_alignment() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("disease_info.csv"),
            "disease_name,description,Possible Steps\nApple Scab,Spots.,Spray.\n",
        )
        .unwrap();

        let err = Bootstrap::lenient(&config(&dir)).err().unwrap();
        assert!(matches!(
            err,
            DetectionError::AlignmentMismatch { expected: 39, actual: 1, .. }
        ));
    }

    #[test]
    fn test_alignment_can_be_relaxed() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("disease_info.csv"),
            "disease_name,description,Possible Steps\nApple Scab,Spots.,Spray.\n",
        )
        .unwrap();

        let mut config = config(&dir);
        config.metadata.strict_alignment = false;
        assert!(Bootstrap::lenient(&config).is_ok());
    }

    #[test]
    fn test_missing_tables_only_degrade() {
        let dir = TempDir::new().unwrap();
        let pipeline = Bootstrap::base_pipeline(&config(&dir)).unwrap();
        assert!(!pipeline.metadata().disease_table().is_loaded());
        assert_eq!(pipeline.labels().len(), 39);
    }

    #[test]
    fn test_labels_longer_than_class_count() {
        let dir = TempDir::new().unwrap();
        let labels_path = dir.path().join("labels.txt");
        fs::write(&labels_path, "A___x\nB___y\nC___z\n").unwrap();

        let mut config = config(&dir);
        config.model.class_count = 2;
        config.model.labels_path = Some(labels_path.display().to_string());

        assert!(matches!(
            Bootstrap::load_labels(&config),
            Err(DetectionError::AlignmentMismatch { table, .. }) if table == "labels"
        ));
    }
}
