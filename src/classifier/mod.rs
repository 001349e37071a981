//! Classifier adapter
//!
//! Wraps a trained model behind a small trait: an RGB image goes in, a class
//! index and the full probability vector come out. Implementations must be
//! usable from several threads at once; the loaded weights are read-only.

pub mod cnn;
pub mod preprocess;

pub use cnn::CandleClassifier;

use image::DynamicImage;

use crate::errors::{DetectionError, Result};
use crate::types::ClassIndex;

/// Output of one forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: ClassIndex,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Build from a normalized probability vector. The index is the argmax,
    /// lowest index on ties.
    pub fn from_probabilities(probabilities: Vec<f32>) -> Result<Self> {
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(DetectionError::Inference(
                "probability vector contains non-finite values".to_string(),
            ));
        }

        let index = argmax(&probabilities).ok_or_else(|| {
            DetectionError::Inference("model returned an empty probability vector".to_string())
        })?;

        Ok(Self {
            index,
            probabilities,
        })
    }

    /// Probability of the predicted class, which is the vector maximum
    pub fn confidence(&self) -> f32 {
        self.probabilities[self.index]
    }
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if v <= best_value => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Trained image classifier
pub trait Classifier: Send + Sync {
    /// Run one image through the model
    fn classify(&self, image: &DynamicImage) -> Result<Prediction>;

    /// Length of every probability vector this classifier returns
    fn class_count(&self) -> usize;

    /// Model status tag reported with each result
    fn status(&self) -> &str;
}
