//! Configuration management for AgriDoctor
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.agridoctor/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{DetectionError, Result};

/// Complete configuration for AgriDoctor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub metadata: MetadataConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub class_count: usize,
    /// Side length of the square model input
    pub input_size: u32,
    /// One label per line; the built-in reference labels when unset
    pub labels_path: Option<String>,
}

/// Advisory tables configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub disease_info_path: String,
    pub supplement_info_path: String,
    /// Fail startup when a loaded table disagrees with the class count
    pub strict_alignment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub timeout_sec: u64,
    pub max_batch_size: usize,
}

/// Detection storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub detections_dir: String,
}

/// Telemetry display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "~/.agridoctor/models/plant_disease_model.pt".to_string(),
            class_count: 39,
            input_size: 224,
            labels_path: None,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            disease_info_path: "~/.agridoctor/disease_info.csv".to_string(),
            supplement_info_path: "~/.agridoctor/supplement_info.csv".to_string(),
            strict_alignment: true,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            timeout_sec: 30,
            max_batch_size: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            detections_dir: "~/.agridoctor/detections".to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| DetectionError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.agridoctor/config.toml, or built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// `~/.agridoctor/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".agridoctor").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.model.class_count == 0 {
            return Err(DetectionError::ConfigError(
                "class_count must be greater than 0".to_string(),
            ));
        }

        // Four 2x2 pools
        if self.model.input_size == 0 || self.model.input_size % 16 != 0 {
            return Err(DetectionError::ConfigError(format!(
                "input_size must be a positive multiple of 16, got {}",
                self.model.input_size
            )));
        }

        if self.inference.max_batch_size == 0 {
            return Err(DetectionError::ConfigError(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.inference.timeout_sec == 0 {
            return Err(DetectionError::ConfigError(
                "timeout_sec must be greater than 0".to_string(),
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => {
                return Err(DetectionError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    self.telemetry.default_verbosity
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DetectionError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DetectionError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DetectionError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn model_path(&self) -> PathBuf {
        Self::expand_path(&self.model.path)
    }

    pub fn labels_path(&self) -> Option<PathBuf> {
        self.model.labels_path.as_deref().map(Self::expand_path)
    }

    pub fn disease_info_path(&self) -> PathBuf {
        Self::expand_path(&self.metadata.disease_info_path)
    }

    pub fn supplement_info_path(&self) -> PathBuf {
        Self::expand_path(&self.metadata.supplement_info_path)
    }

    pub fn detections_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.detections_dir)
    }
}
