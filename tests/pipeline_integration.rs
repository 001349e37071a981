//! Integration tests for the enrichment pipeline
//!
//! Runs full `enrich` calls with a fixed classifier; no model file needed.

mod common;

use common::*;
use std::sync::Arc;

use agridoctor::errors::DetectionError;
use agridoctor::metadata::{MetadataStore, MetadataTable};
use agridoctor::risk::RiskLevel;
use agridoctor::telemetry::TelemetryCollector;
use agridoctor::types::result::{DEGRADED_DESCRIPTION, NO_SUPPLEMENT};
use agridoctor::types::LabelTable;
use agridoctor::{EnrichmentPipeline, ImageInput};

#[test]
fn test_enrich_populates_every_field() {
    let index = reference_index("Tomato___Late_blight");
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, index, 0.92));

    let result = pipeline.enrich(&png_input("leaf.png")).unwrap();

    assert_eq!(result.class_index, index);
    assert_eq!(result.predicted_class.as_str(), "Tomato___Late_blight");
    assert_eq!(result.crop, "Tomato");
    assert_eq!(result.condition, "Late_blight");
    assert_eq!(result.model_status, "CNN");
    assert_eq!(result.class_probabilities.len(), 39);
    assert_eq!(result.class_probabilities["Tomato___Late_blight"], result.confidence);

    let info = &result.disease_info;
    assert_eq!(info.symptoms, vec!["Late_blight shows dark lesions on older leaves"]);
    assert_eq!(
        info.solutions,
        vec!["Remove infected leaves", "Apply fungicide", "Improve drainage"]
    );
    assert_eq!(info.prevention, vec!["Rotate crops"]);
    assert_eq!(
        result.risk_assessment.risk_factors,
        vec!["High humidity", "Wet conditions", "Poor air circulation"]
    );
    assert_eq!(result.supplement_info.name, format!("Supplement {}", index));
    assert!(!result.is_degraded());
}

#[test]
fn test_healthy_label_is_low_risk() {
    let labels = LabelTable::from_labels(["Tomato___Early_blight", "Tomato___Leaf_Mold", "Tomato___healthy"]);
    let pipeline = EnrichmentPipeline::new(labels, MetadataStore::empty())
        .with_classifier(FixedClassifier::new(vec![0.1, 0.05, 0.85]));

    let result = pipeline.enrich(&png_input("leaf.png")).unwrap();
    assert_eq!(result.predicted_class.as_str(), "Tomato___healthy");
    assert_eq!(result.confidence, 0.85);
    assert_eq!(result.risk_assessment.overall_risk, RiskLevel::Low);
}

#[test]
fn test_late_blight_risk_by_confidence() {
    let index = reference_index("Tomato___Late_blight");
    let cases = [
        (0.92, RiskLevel::High),
        (0.7, RiskLevel::Medium),
        (0.5, RiskLevel::Low),
    ];

    for (confidence, expected) in cases {
        let pipeline = reference_pipeline(FixedClassifier::peaked(39, index, confidence));
        let result = pipeline.enrich(&png_input("leaf.png")).unwrap();
        assert_eq!(result.class_index, index);
        assert_eq!(result.risk_assessment.overall_risk, expected, "confidence {}", confidence);
    }
}

#[test]
fn test_missing_rows_degrade_without_error() {
    let rows = 20;
    let metadata = MetadataStore::from_tables(disease_table(rows), supplement_table(rows));

    for index in [rows, rows + 1] {
        let pipeline = EnrichmentPipeline::new(LabelTable::reference(), metadata.clone())
            .with_classifier(FixedClassifier::peaked(39, index, 0.9));

        let result = pipeline.enrich(&png_input("leaf.png")).unwrap();
        assert_eq!(result.class_index, index);
        assert_eq!(result.disease_info.description, DEGRADED_DESCRIPTION);
        assert!(result.disease_info.symptoms.is_empty());
        assert!(result.disease_info.solutions.is_empty());
        assert!(result.disease_info.prevention.is_empty());
        assert!(result.risk_assessment.risk_factors.is_empty());
        assert_eq!(result.supplement_info.name, NO_SUPPLEMENT);
        assert!(result.supplement_info.image_url.is_empty());
        assert!(result.supplement_info.buy_link.is_empty());
    }
}

#[test]
fn test_absent_tables_degrade_every_class() {
    let pipeline = EnrichmentPipeline::new(
        LabelTable::reference(),
        MetadataStore::from_tables(
            MetadataTable::absent("malformed"),
            MetadataTable::absent("missing"),
        ),
    )
    .with_classifier(FixedClassifier::peaked(39, 0, 0.95));

    let result = pipeline.enrich(&png_input("leaf.png")).unwrap();
    assert!(result.is_degraded());
    assert_eq!(result.risk_assessment.overall_risk, RiskLevel::High);
}

#[test]
fn test_label_without_separator() {
    let index = reference_index("Background_without_leaves");
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, index, 0.99));

    let result = pipeline.enrich(&png_input("soil.png")).unwrap();
    assert_eq!(result.crop, "Unknown");
    assert_eq!(result.condition, "Background_without_leaves");
}

#[test]
fn test_batch_isolates_bad_image() {
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 9, 0.8));
    let inputs = vec![
        png_input("first.png"),
        junk_input("second.jpg"),
        png_input("third.png"),
    ];

    let items = pipeline.enrich_batch(&inputs).unwrap();

    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[2].is_ok());

    let error = items[1].error().unwrap();
    assert_eq!(items[1].position, 1);
    assert_eq!(items[1].filename, "second.jpg");
    assert_eq!(error.label, "second.jpg");
    assert!(error.reason.contains("second.jpg"));
}

#[test]
fn test_batch_limit() {
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 0, 0.8));
    let inputs: Vec<_> = (0..11).map(|i| png_input(&format!("{}.png", i))).collect();

    assert!(matches!(
        pipeline.enrich_batch(&inputs),
        Err(DetectionError::BatchTooLarge { count: 11, max: 10 })
    ));
}

#[test]
fn test_repeat_calls_match_except_timestamp() {
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 22, 0.77));
    let input = png_input("leaf.png");

    let first = pipeline.enrich(&input).unwrap();
    let mut second = pipeline.enrich(&input).unwrap();

    assert!(second.created_at >= first.created_at);
    second.created_at = first.created_at;
    assert_eq!(first, second);
}

#[test]
fn test_model_unavailable_until_installed() {
    let pipeline = EnrichmentPipeline::new(LabelTable::reference(), MetadataStore::empty());
    let input = png_input("leaf.png");

    for _ in 0..2 {
        assert!(matches!(
            pipeline.enrich(&input),
            Err(DetectionError::ModelUnavailable)
        ));
    }

    pipeline.install_classifier(FixedClassifier::peaked(39, 3, 0.6));
    assert!(pipeline.enrich(&input).is_ok());
}

#[test]
fn test_input_error_names_image() {
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 0, 0.9));
    let err = pipeline.enrich(&junk_input("broken.jpg")).unwrap_err();
    assert!(matches!(err, DetectionError::InputError { ref image, .. } if image == "broken.jpg"));
}

#[test]
fn test_describe_by_crop_and_disease() {
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 0, 0.9));
    let advisory = pipeline.describe("Potato", "Early_blight").unwrap();

    assert_eq!(advisory.class_index, reference_index("Potato___Early_blight"));
    assert_eq!(advisory.disease_info.solutions.len(), 3);
    assert!(matches!(
        pipeline.describe("Potato", "Frost"),
        Err(DetectionError::UnknownClass(_))
    ));
}

#[test]
fn test_shared_across_threads() {
    let telemetry = TelemetryCollector::new();
    let pipeline = Arc::new(
        reference_pipeline(FixedClassifier::peaked(39, 12, 0.9)).with_telemetry(telemetry.clone()),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.enrich(&png_input(&format!("{}.png", i))))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().class_index, 12);
    }
    assert_eq!(telemetry.get_stats().images_classified, 4);
}

#[test]
fn test_unreadable_file_counts_as_rejected() {
    let telemetry = TelemetryCollector::new();
    let pipeline = reference_pipeline(FixedClassifier::peaked(39, 0, 0.9))
        .with_telemetry(telemetry.clone());

    let path = std::path::Path::new("/nonexistent/agridoctor/leaf.jpg");
    let err = ImageInput::from_path(path).unwrap_err();
    pipeline.record_rejection(&path.display().to_string(), &err);
    assert!(pipeline.enrich(&junk_input("blurry.jpg")).is_err());

    let stats = telemetry.get_stats();
    assert_eq!(stats.images_rejected, 2);
    assert_eq!(stats.images_classified, 0);
    assert_eq!(telemetry.classification_rate(), 0.0);
}
