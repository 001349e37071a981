//! Doctor command for system diagnostics
//!
//! Checks that the model, labels, metadata tables and detection store are
//! usable with the current configuration.

use colored::Colorize;
use std::path::Path;

use crate::bootstrap::{Bootstrap, LenientStart};
use crate::cli::Config;
use crate::errors::Result;
use crate::metadata::{MetadataStore, MetadataTable};
use crate::pipeline::EnrichmentPipeline;
use crate::types::LabelTable;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks. Each artifact is loaded once and the model
    /// goes through the same lenient start the pipeline uses.
    pub fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let labels = Bootstrap::load_labels(&self.config);
        let metadata = MetadataStore::load(
            &self.config.disease_info_path(),
            &self.config.supplement_info_path(),
        );
        let pipeline_labels = match &labels {
            Ok(labels) => labels.clone(),
            Err(_) => LabelTable::reference(),
        };

        let start = Bootstrap::attach_classifier(
            EnrichmentPipeline::new(pipeline_labels, metadata),
            &self.config,
        );
        let metadata = start.pipeline.metadata();

        vec![
            self.check_model(&start),
            self.check_labels(&labels),
            check_table("Disease Table", metadata.disease_table()),
            check_table("Supplement Table", metadata.supplement_table()),
            self.check_alignment(metadata),
            self.check_detections_dir(),
        ]
    }

    /// Check 1: model loads
    fn check_model(&self, start: &LenientStart) -> HealthCheck {
        let path = self.config.model_path();
        match &start.model_error {
            None => HealthCheck::new("Model", HealthStatus::Pass),
            Some(_) if !path.exists() => HealthCheck::new(
                "Model",
                HealthStatus::Fail(format!("Not found: {}", path.display())),
            ),
            Some(e) => HealthCheck::new("Model", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Check 2: label table
    fn check_labels(&self, labels: &Result<LabelTable>) -> HealthCheck {
        match labels {
            Ok(labels) if labels.len() < self.config.model.class_count => HealthCheck::new(
                "Labels",
                HealthStatus::Warn(format!(
                    "{} labels for {} classes; extra classes report as Unknown",
                    labels.len(),
                    self.config.model.class_count
                )),
            ),
            Ok(_) => HealthCheck::new("Labels", HealthStatus::Pass),
            Err(e) => HealthCheck::new("Labels", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Check 5: loaded tables agree with the class count
    fn check_alignment(&self, metadata: &MetadataStore) -> HealthCheck {
        match metadata.check_alignment(self.config.model.class_count) {
            Ok(()) => HealthCheck::new("Alignment", HealthStatus::Pass),
            Err(e) if !self.config.metadata.strict_alignment => {
                HealthCheck::new("Alignment", HealthStatus::Warn(e.to_string()))
            }
            Err(e) => HealthCheck::new("Alignment", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Check 6: detection store is writable
    fn check_detections_dir(&self) -> HealthCheck {
        let dir = self.config.detections_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            return HealthCheck::new(
                "Detections Dir",
                HealthStatus::Fail(format!("Cannot create {}: {}", dir.display(), e)),
            );
        }

        check_writable(&dir)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "AgriDoctor System Diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };

            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Checks 3 and 4: metadata tables. Absent tables degrade output, so
/// they warn instead of failing.
fn check_table<T>(name: &str, table: &MetadataTable<T>) -> HealthCheck {
    match table {
        MetadataTable::Loaded(_) => HealthCheck::new(name, HealthStatus::Pass),
        MetadataTable::Absent { reason } => HealthCheck::new(
            name,
            HealthStatus::Warn(format!("Not loaded ({}); advice will be degraded", reason)),
        ),
    }
}

fn check_writable(dir: &Path) -> HealthCheck {
    let probe = dir.join(".agridoctor_probe");
    match std::fs::write(&probe, "probe") {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            HealthCheck::new("Detections Dir", HealthStatus::Pass)
        }
        Err(_) => HealthCheck::new(
            "Detections Dir",
            HealthStatus::Fail(format!("No write permission in {}", dir.display())),
        ),
    }
}
