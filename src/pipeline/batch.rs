//! Per-item batch results

use serde::{Deserialize, Serialize};

use crate::errors::DetectionError;
use crate::types::EnrichedResult;

/// Error payload for one failed image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub label: String,
    pub reason: String,
}

impl ItemError {
    pub fn new(label: impl Into<String>, error: &DetectionError) -> Self {
        Self {
            label: label.into(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Result(Box<EnrichedResult>),
    Error(ItemError),
}

/// One position in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub position: usize,
    pub filename: String,
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn result(&self) -> Option<&EnrichedResult> {
        match &self.outcome {
            BatchOutcome::Result(result) => Some(&**result),
            BatchOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match &self.outcome {
            BatchOutcome::Result(_) => None,
            BatchOutcome::Error(error) => Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_item_serialization() {
        let item = BatchItem {
            position: 1,
            filename: "broken.jpg".to_string(),
            outcome: BatchOutcome::Error(ItemError::new(
                "broken.jpg",
                &DetectionError::input("broken.jpg", "truncated"),
            )),
        };

        assert!(!item.is_ok());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["position"], 1);
        assert_eq!(json["outcome"]["error"]["label"], "broken.jpg");
        assert!(json["outcome"]["error"]["reason"]
            .as_str()
            .unwrap()
            .contains("truncated"));
    }
}
