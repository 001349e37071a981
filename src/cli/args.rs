//! Command-line argument parsing for AgriDoctor
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::persistence::{DetectionContext, GeoPoint, WeatherSnapshot};

/// AgriDoctor - plant disease detection with treatment advice
#[derive(Parser, Debug)]
#[command(name = "agridoctor")]
#[command(version)]
#[command(about = "Classify leaf images and report disease advisories", long_about = None)]
pub struct Args {
    /// Leaf images to classify
    #[arg(value_name = "IMAGES")]
    pub images: Vec<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Save each result to the detection store
    #[arg(long)]
    pub save: bool,

    /// User the detections belong to
    #[arg(long)]
    pub user: Option<String>,

    /// Crop record the detections belong to
    #[arg(long)]
    pub crop_id: Option<String>,

    /// Latitude of the field
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the field
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Relative humidity (%)
    #[arg(long)]
    pub humidity: Option<f64>,

    /// Temperature (°C)
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: Option<f64>,

    /// Rainfall (mm)
    #[arg(long)]
    pub rainfall: Option<f64>,

    /// Crop growth stage
    #[arg(long)]
    pub growth_stage: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the class labels the model predicts
    Classes,

    /// Show advisory information for a crop and disease
    Info {
        crop: String,
        disease: String,
    },

    /// Show a user's saved detections, newest first
    History {
        user: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show detection statistics
    Stats {
        /// Limit to one user
        #[arg(long)]
        user: Option<String>,
    },

    /// Run system diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config {
        /// Write it to the config file (`--config` or the default location)
        #[arg(long)]
        write: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Images are required without a subcommand and rejected with one
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_none() && self.images.is_empty() {
            return Err(
                "At least one image required. Use 'agridoctor <IMAGES>...' or run a subcommand."
                    .to_string(),
            );
        }

        if self.command.is_some() && !self.images.is_empty() {
            return Err("Cannot specify images with subcommand.".to_string());
        }

        Ok(())
    }

    /// Context stored alongside saved detections
    pub fn detection_context(&self, image: &std::path::Path) -> DetectionContext {
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };

        let weather = WeatherSnapshot {
            humidity: self.humidity,
            temperature: self.temperature,
            rainfall: self.rainfall,
            growth_stage: self.growth_stage.clone(),
        };

        DetectionContext {
            user_id: self.user.clone(),
            crop_id: self.crop_id.clone(),
            image_ref: Some(image.display().to_string()),
            location,
            weather: (!weather.is_empty()).then_some(weather),
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Parse a configured verbosity name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-image details
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Default tracing filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }
}
