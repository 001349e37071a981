//! Inference and enrichment pipeline

pub mod batch;
pub mod input;
pub mod orchestrator;

pub use batch::{BatchItem, BatchOutcome, ItemError};
pub use input::ImageInput;
pub use orchestrator::{
    ClassAdvisory, DetectionOutcome, EnrichmentPipeline, SaveStatus, DEFAULT_MAX_BATCH_SIZE,
};
