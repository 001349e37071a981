//! Telemetry system for AgriDoctor
//!
//! Collects pipeline events in memory and prints a run summary.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::types::ClassIndex;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Image could not be decoded
    ImageRejected {
        image: String,
        reason: String,
        timestamp: Instant,
    },
    InferenceCompleted {
        class_index: ClassIndex,
        confidence: f32,
        duration_ms: u64,
        timestamp: Instant,
    },
    /// A metadata lookup fell back to sentinel values
    MetadataDegraded {
        table: String,
        class_index: ClassIndex,
        timestamp: Instant,
    },
    DetectionSaved {
        success: bool,
        timestamp: Instant,
    },
}

impl TelemetryEvent {
    /// One-line description for the run summary
    pub fn describe(&self) -> String {
        match self {
            TelemetryEvent::ImageRejected { image, reason, .. } => {
                format!("rejected {}: {}", image, reason)
            }
            TelemetryEvent::InferenceCompleted {
                class_index,
                confidence,
                duration_ms,
                ..
            } => format!(
                "class {} at {:.1}% in {}ms",
                class_index,
                confidence * 100.0,
                duration_ms
            ),
            TelemetryEvent::MetadataDegraded {
                table, class_index, ..
            } => format!("no {} row for class {}", table, class_index),
            TelemetryEvent::DetectionSaved { success: true, .. } => "detection saved".to_string(),
            TelemetryEvent::DetectionSaved { success: false, .. } => "save failed".to_string(),
        }
    }
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub images_classified: usize,
    pub images_rejected: usize,
    pub degraded_lookups: usize,
    pub detections_saved: usize,
    pub save_failures: usize,
    pub total_inference_ms: u64,
}

/// Events kept for inspection; older ones are dropped, stats keep counting
pub const MAX_RECENT_EVENTS: usize = 1000;

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(64))),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::ImageRejected { .. } => {
                    stats.images_rejected += 1;
                }
                TelemetryEvent::InferenceCompleted { duration_ms, .. } => {
                    stats.images_classified += 1;
                    stats.total_inference_ms += duration_ms;
                }
                TelemetryEvent::MetadataDegraded { .. } => {
                    stats.degraded_lookups += 1;
                }
                TelemetryEvent::DetectionSaved { success, .. } => {
                    if *success {
                        stats.detections_saved += 1;
                    } else {
                        stats.save_failures += 1;
                    }
                }
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_RECENT_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.range(start..).cloned().collect()
    }

    /// Share of images that made it through classification
    pub fn classification_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.images_classified + stats.images_rejected;
        if total == 0 {
            1.0
        } else {
            stats.images_classified as f64 / total as f64
        }
    }

    /// Mean inference time in milliseconds
    pub fn average_inference_ms(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.images_classified == 0 {
            0.0
        } else {
            stats.total_inference_ms as f64 / stats.images_classified as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Events listed in a verbose run summary
const SUMMARY_EVENTS: usize = 20;

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\nRun Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", elapsed);
        println!("Images classified: {}", stats.images_classified);
        println!("Images rejected:   {}", stats.images_rejected);
        println!("Classified rate:   {:.1}%", self.collector.classification_rate() * 100.0);
        println!("Avg inference:     {:.1}ms", self.collector.average_inference_ms());
        println!("Degraded lookups:  {}", stats.degraded_lookups);
        if stats.detections_saved + stats.save_failures > 0 {
            println!("Saved:             {}", stats.detections_saved);
            println!("Save failures:     {}", stats.save_failures);
        }

        if self.should_show_details() {
            let events = self.collector.recent_events(SUMMARY_EVENTS);
            if !events.is_empty() {
                println!("\nRecent events:");
                for event in &events {
                    println!("  {}", event.describe());
                }
            }
        }
        println!();
    }

    /// Check if should show per-image events
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference(ms: u64) -> TelemetryEvent {
        TelemetryEvent::InferenceCompleted {
            class_index: 3,
            confidence: 0.9,
            duration_ms: ms,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.get_stats().images_classified, 0);
    }

    #[test]
    fn test_record_inference() {
        let collector = TelemetryCollector::new();
        collector.record(inference(40));
        collector.record(inference(60));

        let stats = collector.get_stats();
        assert_eq!(stats.images_classified, 2);
        assert_eq!(stats.total_inference_ms, 100);
        assert!((collector.average_inference_ms() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_classification_rate() {
        let collector = TelemetryCollector::new();
        collector.record(inference(10));
        collector.record(inference(10));
        collector.record(TelemetryEvent::ImageRejected {
            image: "bad.jpg".to_string(),
            reason: "truncated".to_string(),
            timestamp: Instant::now(),
        });

        let rate = collector.classification_rate();
        assert!((rate - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_save_events() {
        let collector = TelemetryCollector::new();
        collector.record(TelemetryEvent::DetectionSaved {
            success: true,
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::DetectionSaved {
            success: false,
            timestamp: Instant::now(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.detections_saved, 1);
        assert_eq!(stats.save_failures, 1);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for i in 0..10 {
            collector.record(TelemetryEvent::MetadataDegraded {
                table: "disease_info".to_string(),
                class_index: i,
                timestamp: Instant::now(),
            });
        }

        let recent = collector.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(collector.get_stats().degraded_lookups, 10);
    }

    #[test]
    fn test_event_buffer_is_bounded() {
        let collector = TelemetryCollector::new();
        for i in 0..MAX_RECENT_EVENTS + 500 {
            collector.record(TelemetryEvent::MetadataDegraded {
                table: "supplement_info".to_string(),
                class_index: i,
                timestamp: Instant::now(),
            });
        }

        assert_eq!(collector.event_count(), MAX_RECENT_EVENTS);
        assert_eq!(collector.get_stats().degraded_lookups, MAX_RECENT_EVENTS + 500);

        match collector.recent_events(1).as_slice() {
            [TelemetryEvent::MetadataDegraded { class_index, .. }] => {
                assert_eq!(*class_index, MAX_RECENT_EVENTS + 499)
            }
            other => panic!("unexpected events: {:?}", other),
        }
        match collector.recent_events(MAX_RECENT_EVENTS).first() {
            Some(TelemetryEvent::MetadataDegraded { class_index, .. }) => {
                assert_eq!(*class_index, 500)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_descriptions() {
        assert_eq!(inference(12).describe(), "class 3 at 90.0% in 12ms");

        let degraded = TelemetryEvent::MetadataDegraded {
            table: "disease_info".to_string(),
            class_index: 40,
            timestamp: Instant::now(),
        };
        assert_eq!(degraded.describe(), "no disease_info row for class 40");
    }

    #[test]
    fn test_details_follow_verbosity() {
        use crate::cli::Verbosity;

        let collector = TelemetryCollector::new();
        assert!(!TelemetryDisplay::new(collector.clone(), Verbosity::Normal).should_show_details());
        assert!(TelemetryDisplay::new(collector, Verbosity::Verbose).should_show_details());
    }

    #[test]
    fn test_clones_share_state() {
        let collector = TelemetryCollector::new();
        let clone = collector.clone();
        clone.record(inference(5));
        assert_eq!(collector.event_count(), 1);
    }
}
