//! Validated runtime configuration
//!
//! Command line arguments are parsed by clap and converted into the
//! structs below before any stage runs, so an invalid input fails fast.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default close-approach threshold in kilometers
pub const DEFAULT_THRESHOLD_KM: f64 = 50.0;
/// Number of element sets propagated per run
pub const DEFAULT_MAX_OBJECTS: usize = 10;
/// Prediction horizon in days
pub const DEFAULT_DAYS: u32 = 1;
/// Spacing between samples (10 minutes)
pub const DEFAULT_STEP_SECONDS: u64 = 600;

const PREDICTIONS_FILE: &str = "satellite_predictions.json";
const ALERTS_FILE: &str = "collision_alerts.json";
const VISUALIZATION_FILE: &str = "satellite_orbits.png";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("threshold must be a positive number of kilometers, got {0}")]
    InvalidThreshold(f64),
    #[error("step-seconds must be > 0")]
    ZeroStep,
    #[error("prediction horizon must contain at least one sample")]
    EmptyHorizon,
    #[error("max-objects must be > 0")]
    ZeroObjectCap,
    #[error("image size must be non-zero, got {width}x{height}")]
    ZeroImageSize { width: u32, height: u32 },
}

/// Distance below which two objects are reported as a close approach
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdKm(f64);

impl ThresholdKm {
    pub fn new(km: f64) -> Result<Self, ConfigError> {
        if km.is_finite() && km > 0.0 {
            Ok(Self(km))
        } else {
            Err(ConfigError::InvalidThreshold(km))
        }
    }

    pub fn km(self) -> f64 {
        self.0
    }
}

impl Default for ThresholdKm {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD_KM)
    }
}

/// Locations of every persisted artifact
///
/// Injected into the stores and the renderer at construction instead of
/// living in process-wide constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub predictions_path: PathBuf,
    pub alerts_path: PathBuf,
    pub visualization_path: PathBuf,
}

impl StorageConfig {
    /// Standard file names inside a single storage directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            predictions_path: dir.join(PREDICTIONS_FILE),
            alerts_path: dir.join(ALERTS_FILE),
            visualization_path: dir.join(VISUALIZATION_FILE),
        }
    }
}
