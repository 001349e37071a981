//! Class index and label table
//!
//! Every class index produced by the model maps to at most one label of the
//! form `<Crop>___<Condition>`. The table is built once at startup and only
//! read afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::{DetectionError, Result};

/// Position in the model output vector and in both metadata tables
pub type ClassIndex = usize;

/// Separator between crop and condition inside a label
pub const LABEL_SEPARATOR: &str = "___";

/// Crop name used when a label carries no separator
pub const UNKNOWN_CROP: &str = "Unknown";

/// Label reported for an index the table does not cover
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Reference PlantVillage label order for the 39-class CNN
pub const REFERENCE_LABELS: [&str; 39] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Background_without_leaves",
    "Blueberry___healthy",
    "Cherry___Powdery_mildew",
    "Cherry___healthy",
    "Corn___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn___Common_rust",
    "Corn___Northern_Leaf_Blight",
    "Corn___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// Human-readable `Crop___Condition` label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabel(String);

impl ClassLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (crop, condition); labels without a separator belong to
    /// the unknown crop and keep the raw label as condition
    pub fn split(&self) -> (&str, &str) {
        match self.0.split_once(LABEL_SEPARATOR) {
            Some((crop, condition)) => (crop, condition),
            None => (UNKNOWN_CROP, self.0.as_str()),
        }
    }

    pub fn crop(&self) -> &str {
        self.split().0
    }

    pub fn condition(&self) -> &str {
        self.split().1
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static index -> label lookup
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<ClassLabel>,
}

impl LabelTable {
    /// Table for the reference 39-class model
    pub fn reference() -> Self {
        Self::from_labels(REFERENCE_LABELS)
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(ClassLabel::new).collect(),
        }
    }

    /// Load a labels file, one label per line in class order
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DetectionError::ConfigError(format!(
                "Failed to read labels file {}: {}",
                path.display(),
                e
            ))
        })?;

        let table = Self::from_labels(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );

        if table.is_empty() {
            return Err(DetectionError::ConfigError(format!(
                "Labels file {} contains no labels",
                path.display()
            )));
        }

        Ok(table)
    }

    pub fn get(&self, index: ClassIndex) -> Option<&ClassLabel> {
        self.labels.get(index)
    }

    /// Index of an exact label
    pub fn position(&self, label: &str) -> Option<ClassIndex> {
        self.labels.iter().position(|l| l.as_str() == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassIndex, &ClassLabel)> {
        self.labels.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reference_table_size() {
        assert_eq!(LabelTable::reference().len(), 39);
    }

    #[test]
    fn test_split_with_separator() {
        let label = ClassLabel::new("Tomato___Late_blight");
        assert_eq!(label.split(), ("Tomato", "Late_blight"));
    }

    #[test]
    fn test_split_keeps_comma_crop() {
        let label = ClassLabel::new("Pepper,_bell___Bacterial_spot");
        assert_eq!(label.crop(), "Pepper,_bell");
        assert_eq!(label.condition(), "Bacterial_spot");
    }

    #[test]
    fn test_split_without_separator() {
        let label = ClassLabel::new("Background_without_leaves");
        assert_eq!(label.crop(), UNKNOWN_CROP);
        assert_eq!(label.condition(), "Background_without_leaves");
    }

    #[test]
    fn test_every_reference_label_splits() {
        for (_, label) in LabelTable::reference().iter() {
            let (crop, condition) = label.split();
            assert!(!crop.is_empty());
            assert!(!condition.is_empty());
            if label.as_str().contains(LABEL_SEPARATOR) {
                assert_eq!(format!("{}{}{}", crop, LABEL_SEPARATOR, condition), label.as_str());
            } else {
                assert_eq!(crop, UNKNOWN_CROP);
            }
        }
    }

    #[test]
    fn test_position_lookup() {
        let table = LabelTable::reference();
        assert_eq!(table.position("Tomato___healthy"), Some(38));
        assert_eq!(table.position("Apple___Apple_scab"), Some(0));
        assert_eq!(table.position("Banana___healthy"), None);
    }

    #[test]
    fn test_get_out_of_range() {
        assert!(LabelTable::reference().get(39).is_none());
    }

    #[test]
    fn test_load_labels_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Rice___healthy").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  Rice___Brown_spot  ").unwrap();

        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().as_str(), "Rice___Brown_spot");
    }

    #[test]
    fn test_load_empty_labels_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(LabelTable::load(file.path()).is_err());
    }
}
