//! AgriDoctor - plant disease detection and advisory enrichment
//!
//! Classifies a leaf image into a `<Crop>___<Condition>` label and enriches
//! the prediction with advice from two metadata tables keyed by class index.
//!
//! # Architecture
//!
//! - **Classifier**: image -> class index + probability vector (Candle CNN)
//! - **Metadata**: disease and supplement tables, loaded once, read-only
//! - **Heuristics / Risk**: pure rules over metadata text and confidence
//! - **Pipeline**: assembles one `EnrichedResult` per image
//! - **Persistence**: stores finished results with caller context

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{DetectionError, Result};

// Core pipeline
pub mod classifier;
pub mod heuristics;
pub mod metadata;
pub mod pipeline;
pub mod risk;

pub use pipeline::{EnrichmentPipeline, ImageInput};
pub use types::EnrichedResult;

// Storage boundary
pub mod persistence;

// Startup, CLI and diagnostics
pub mod bootstrap;
pub mod cli;
pub mod doctor;
pub mod telemetry;

// Deadline-bounded execution for async callers
pub mod execution;
