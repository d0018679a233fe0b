use opencv::core::Mat;
use tracing::info;

use crate::bbox::{BoundingBox, CropRectangle};
use crate::config::Config;
use crate::coordinator::{TrackingCoordinator, TrackingState};
use crate::detection::{FaceDetector, YuNetDetector};
use crate::error::Result;
use crate::resample::resample;
use crate::tracker::{OpenCvTracker, SubjectTracker};
use crate::utils::frame_size;
use crate::viewport::ViewportController;

/// Result of one pipeline step.
pub struct FrameOutput {
    /// Zoomed frame, same size as the input.
    pub frame: Mat,
    /// Subject box in input resolution, if one was found.
    pub subject: Option<BoundingBox>,
    /// Crop window applied to the input.
    pub crop: CropRectangle,
}

/// Per-frame virtual pan-tilt-zoom: locate, smooth, resample.
pub struct ZoomPipeline {
    coordinator: TrackingCoordinator,
    viewport: ViewportController,
}

impl ZoomPipeline {
    pub fn new(coordinator: TrackingCoordinator, viewport: ViewportController) -> Self {
        ZoomPipeline {
            coordinator,
            viewport,
        }
    }

    /// Build with the YuNet detector and OpenCV tracker named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let detector: Box<dyn FaceDetector> = Box::new(YuNetDetector::new(
            &config.model_path,
            config.min_confidence,
            config.model_variant,
            config.nms_threshold,
        )?);
        let tracker = OpenCvTracker::new(config.tracker);
        info!("Using {:?} tracker", tracker.kind());
        let tracker: Box<dyn SubjectTracker> = Box::new(tracker);
        Ok(Self::new(
            TrackingCoordinator::new(detector, tracker, config.process_width),
            ViewportController::new(config.smoothing_factor, config.margin_factor)?,
        ))
    }

    pub fn process(&mut self, frame: &Mat) -> Result<FrameOutput> {
        let size = frame_size(frame)?;
        let subject = self.coordinator.locate(frame)?;
        let crop = self.viewport.update(subject, size);
        let zoomed = resample(frame, &crop)?;
        Ok(FrameOutput {
            frame: zoomed,
            subject,
            crop,
        })
    }

    /// Explicit user reset: drop the subject and the smoothed viewport.
    pub fn reset(&mut self) {
        self.coordinator.reset();
        self.viewport.reset();
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.coordinator.state()
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }
}
