//! Shared fixtures for integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use agridoctor::classifier::{Classifier, Prediction};
use agridoctor::metadata::table::parse_csv;
use agridoctor::metadata::{MetadataStore, MetadataTable};
use agridoctor::types::LabelTable;
use agridoctor::{EnrichmentPipeline, ImageInput, Result};

/// Returns the same probability vector for every image
pub struct FixedClassifier {
    probabilities: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(probabilities: Vec<f32>) -> Arc<Self> {
        Arc::new(Self { probabilities })
    }

    /// Vector of `len` with `peak` at `index` and the rest spread evenly
    pub fn peaked(len: usize, index: usize, peak: f32) -> Arc<Self> {
        let rest = (1.0 - peak) / (len - 1) as f32;
        let mut probabilities = vec![rest; len];
        probabilities[index] = peak;
        Self::new(probabilities)
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Prediction> {
        Prediction::from_probabilities(self.probabilities.clone())
    }

    fn class_count(&self) -> usize {
        self.probabilities.len()
    }

    fn status(&self) -> &str {
        "CNN"
    }
}

/// PNG-encoded solid leaf-green square
pub fn png_input(name: &str) -> ImageInput {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([34, 139, 34])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ImageInput::from_bytes(name, bytes)
}

pub fn junk_input(name: &str) -> ImageInput {
    ImageInput::from_bytes(name, b"definitely not an image".to_vec())
}

/// Disease table with one row per reference class up to `rows`
pub fn disease_table(rows: usize) -> MetadataTable<agridoctor::metadata::AdvisoryRecord> {
    let mut csv = String::from("disease_name,description,Possible Steps\n");
    for (_, label) in LabelTable::reference().iter().take(rows) {
        csv.push_str(&format!(
            "{},\"{} shows dark lesions on older leaves. Growth slows.\",\"Remove infected leaves. Apply fungicide. Improve drainage. Rotate crops.\"\n",
            label.condition(),
            label.condition()
        ));
    }
    MetadataTable::Loaded(parse_csv(&csv).unwrap())
}

pub fn supplement_table(rows: usize) -> MetadataTable<agridoctor::metadata::SupplementRecord> {
    let mut csv = String::from("supplement name,supplement image,buy link\n");
    for i in 0..rows {
        csv.push_str(&format!(
            "Supplement {},https://img.example/{}.png,https://shop.example/{}\n",
            i, i, i
        ));
    }
    MetadataTable::Loaded(parse_csv(&csv).unwrap())
}

/// Reference labels with full metadata and the given classifier
pub fn reference_pipeline(classifier: Arc<FixedClassifier>) -> EnrichmentPipeline {
    EnrichmentPipeline::new(
        LabelTable::reference(),
        MetadataStore::from_tables(disease_table(39), supplement_table(39)),
    )
    .with_classifier(classifier)
}

pub fn reference_index(label: &str) -> usize {
    LabelTable::reference().position(label).unwrap()
}
