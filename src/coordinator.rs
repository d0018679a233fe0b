//! Handoff between expensive face detection and cheap frame-to-frame tracking.
//!
//! Detection runs only while no subject is being tracked. Tracking is trusted
//! until the tracker itself reports failure, at which point detection is retried
//! on the very same frame.

use opencv::{
    core::{Mat, Size},
    imgproc,
    prelude::*,
};
use tracing::{debug, warn};

use crate::bbox::BoundingBox;
use crate::detection::FaceDetector;
use crate::error::Result;
use crate::tracker::SubjectTracker;
use crate::utils::{frame_size, largest_by_area};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Tracking,
}

pub struct TrackingCoordinator {
    detector: Box<dyn FaceDetector>,
    tracker: Box<dyn SubjectTracker>,
    state: TrackingState,
    /// Width of the copy handed to the capabilities; wider frames are downscaled.
    process_width: i32,
}

impl TrackingCoordinator {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        tracker: Box<dyn SubjectTracker>,
        process_width: i32,
    ) -> Self {
        TrackingCoordinator {
            detector,
            tracker,
            state: TrackingState::Idle,
            process_width,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Forget the current subject; the next call re-detects.
    pub fn reset(&mut self) {
        self.state = TrackingState::Idle;
    }

    /// Locate the subject in `frame`. The box is in `frame`'s own resolution.
    pub fn locate(&mut self, frame: &Mat) -> Result<Option<BoundingBox>> {
        let full_size = frame_size(frame)?;

        let scale = if full_size.width > self.process_width {
            self.process_width as f64 / full_size.width as f64
        } else {
            1.0
        };
        let resized;
        let work: &Mat = if scale < 1.0 {
            let mut small = Mat::default();
            imgproc::resize(
                frame,
                &mut small,
                Size::new(
                    self.process_width,
                    ((full_size.height as f64 * scale) as i32).max(1),
                ),
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )?;
            resized = small;
            &resized
        } else {
            frame
        };
        let work_size = work.size()?;

        let found = match self.state {
            TrackingState::Tracking => match self.track(work, work_size) {
                Some(bbox) => Some(bbox),
                None => {
                    debug!("track lost, re-detecting on the same frame");
                    self.state = TrackingState::Idle;
                    self.detect(work, work_size)?
                }
            },
            TrackingState::Idle => self.detect(work, work_size)?,
        };

        Ok(found.and_then(|bbox| bbox.unscale(scale).clamp_to(full_size)))
    }

    fn track(&mut self, work: &Mat, work_size: Size) -> Option<BoundingBox> {
        match self.tracker.update(work) {
            Ok(Some(bbox)) => {
                let clamped = bbox.clamp_to(work_size);
                if clamped.is_none() {
                    debug!("tracked box {:?} left the frame", bbox);
                }
                clamped
            }
            Ok(None) => None,
            Err(e) => {
                warn!("tracker update failed: {}", e);
                None
            }
        }
    }

    fn detect(&mut self, work: &Mat, work_size: Size) -> Result<Option<BoundingBox>> {
        let candidates = self.detector.detect(work)?;
        let Some(subject) =
            largest_by_area(candidates.iter().filter_map(|c| c.clamp_to(work_size)))
        else {
            debug!("no face among {} candidate(s)", candidates.len());
            return Ok(None);
        };

        match self.tracker.init(work, subject) {
            Ok(()) => {
                debug!("subject acquired at {:?}", subject);
                self.state = TrackingState::Tracking;
            }
            Err(e) => {
                warn!("tracker init failed, staying idle: {}", e);
                self.state = TrackingState::Idle;
            }
        }
        Ok(Some(subject))
    }
}
