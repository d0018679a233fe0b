//! Virtual pan-tilt-zoom for a single face in a live video stream.
//!
//! Each frame flows through three stages:
//! 1. [`coordinator::TrackingCoordinator`] finds the subject, re-running face
//!    detection only when the short-term tracker loses it.
//! 2. [`viewport::ViewportController`] smooths the subject box and derives a
//!    margin-padded crop window with the frame's aspect ratio.
//! 3. [`resample::resample`] cuts the window out and scales it back to the
//!    frame size.
//!
//! [`pipeline::ZoomPipeline`] wires the three together.

pub mod bbox;
pub mod config;
pub mod coordinator;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod resample;
pub mod tracker;
pub mod utils;
pub mod viewport;
pub mod visualization;

// Re-export main types
pub use crate::bbox::{BoundingBox, CropRectangle};
pub use crate::config::Config;
pub use crate::coordinator::{TrackingCoordinator, TrackingState};
pub use crate::error::{Error, Result};
pub use crate::pipeline::{FrameOutput, ZoomPipeline};
pub use crate::viewport::ViewportController;
