//! Type definitions module
//!
//! Class labels and the enriched result aggregate.

pub mod labels;
pub mod result;

// Re-export commonly used types
pub use labels::{ClassIndex, ClassLabel, LabelTable};
pub use result::{DiseaseInfo, EnrichedResult, RiskAssessment, SupplementInfo};
