use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::detection::ModelVariant;
use crate::error::{Error, Result};
use crate::tracker::TrackerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: String,
    pub min_confidence: f32,
    pub model_variant: ModelVariant,
    pub nms_threshold: f32,
    pub tracker: TrackerKind,
    pub smoothing_factor: f64,
    pub margin_factor: f64,
    /// Width of the downscaled copy used for detection and tracking.
    pub process_width: i32,
    pub mirror: bool,
    pub show_fps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_path: "models/face_detection_yunet_2023mar.onnx".to_string(),
            min_confidence: 0.6,
            model_variant: ModelVariant::ShortRange,
            nms_threshold: 0.3,
            tracker: TrackerKind::Kcf,
            smoothing_factor: 0.15,
            margin_factor: 0.6,
            process_width: 640,
            mirror: true,
            show_fps: true,
        }
    }
}

impl Config {
    /// Load from a JSON file. Fields missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if !(self.margin_factor >= 0.0 && self.margin_factor.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "margin_factor must be >= 0, got {}",
                self.margin_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.process_width <= 0 {
            return Err(Error::InvalidConfig(format!(
                "process_width must be positive, got {}",
                self.process_width
            )));
        }
        Ok(())
    }
}
