//! Raw image input

use std::path::Path;

use crate::errors::{DetectionError, Result};

/// Encoded image bytes plus the name used in error reports
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image file; unreadable files are input errors
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| DetectionError::input(&name, e))?;
        Ok(Self { name, bytes })
    }
}
