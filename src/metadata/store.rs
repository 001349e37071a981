//! Read-only advisory and supplement tables

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{DetectionError, Result};
use crate::metadata::table::MetadataTable;
use crate::types::ClassIndex;

/// One disease-table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    #[serde(alias = "Disease Name")]
    pub disease_name: String,
    #[serde(alias = "Description")]
    pub description: String,
    #[serde(rename = "Possible Steps", alias = "possible_steps")]
    pub possible_steps: String,
}

/// One supplement-table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementRecord {
    #[serde(rename = "supplement name", alias = "name")]
    pub name: String,
    #[serde(rename = "supplement image", alias = "image_url")]
    pub image_url: String,
    #[serde(rename = "buy link", alias = "buy_link")]
    pub buy_link: String,
}

/// Both metadata tables, loaded once at startup
#[derive(Debug, Clone)]
pub struct MetadataStore {
    disease: MetadataTable<AdvisoryRecord>,
    supplement: MetadataTable<SupplementRecord>,
}

impl MetadataStore {
    /// Load both tables independently; either may end up absent
    pub fn load(disease_path: &Path, supplement_path: &Path) -> Self {
        Self {
            disease: MetadataTable::load(disease_path),
            supplement: MetadataTable::load(supplement_path),
        }
    }

    pub fn from_tables(
        disease: MetadataTable<AdvisoryRecord>,
        supplement: MetadataTable<SupplementRecord>,
    ) -> Self {
        Self { disease, supplement }
    }

    /// Store with both tables absent
    pub fn empty() -> Self {
        Self::from_tables(
            MetadataTable::absent("not loaded"),
            MetadataTable::absent("not loaded"),
        )
    }

    pub fn advisory(&self, index: ClassIndex) -> Option<&AdvisoryRecord> {
        self.disease.lookup(index)
    }

    pub fn supplement(&self, index: ClassIndex) -> Option<&SupplementRecord> {
        self.supplement.lookup(index)
    }

    pub fn disease_table(&self) -> &MetadataTable<AdvisoryRecord> {
        &self.disease
    }

    pub fn supplement_table(&self) -> &MetadataTable<SupplementRecord> {
        &self.supplement
    }

    /// Fail when a loaded table disagrees with the model's class count.
    /// Absent tables pass: they only degrade output.
    pub fn check_alignment(&self, class_count: usize) -> Result<()> {
        check_table("disease_info", self.disease.len(), class_count)?;
        check_table("supplement_info", self.supplement.len(), class_count)
    }
}

fn check_table(table: &str, len: Option<usize>, class_count: usize) -> Result<()> {
    match len {
        Some(actual) if actual != class_count => Err(DetectionError::AlignmentMismatch {
            table: table.to_string(),
            expected: class_count,
            actual,
        }),
        _ => Ok(()),
    }
}
