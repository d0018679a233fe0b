use opencv::{
    core::{Mat, Ptr, Size},
    dnn::{DNN_BACKEND_DEFAULT, DNN_TARGET_CPU},
    imgproc,
    objdetect::FaceDetectorYN,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};

/// Faces to keep per inference before NMS.
const TOP_K: i32 = 50;

/// Short-range inference never runs on more pixels than this width.
const SHORT_RANGE_WIDTH: i32 = 320;

/// Stateless face detection capability.
pub trait FaceDetector {
    /// Return candidate face boxes in absolute pixel coordinates of `frame`,
    /// in no particular order.
    fn detect(&mut self, frame: &Mat) -> Result<Vec<BoundingBox>>;
}

/// Working-distance trade-off of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Faces close to the camera; inference on a reduced copy.
    ShortRange,
    /// Faces further away; inference at full processing resolution.
    FullRange,
}

impl ModelVariant {
    /// Scale applied to a frame of `frame_width` before inference.
    pub fn inference_scale(&self, frame_width: i32) -> f64 {
        match self {
            ModelVariant::ShortRange if frame_width > SHORT_RANGE_WIDTH => {
                SHORT_RANGE_WIDTH as f64 / frame_width as f64
            }
            _ => 1.0,
        }
    }
}

/// OpenCV YuNet face detector.
pub struct YuNetDetector {
    detector: Ptr<FaceDetectorYN>,
    variant: ModelVariant,
    min_confidence: f32,
}

impl YuNetDetector {
    pub fn new(
        model_path: &str,
        min_confidence: f32,
        variant: ModelVariant,
        nms_threshold: f32,
    ) -> Result<Self> {
        if !Path::new(model_path).exists() {
            return Err(Error::Model(format!("YuNet model not found at {model_path}")));
        }

        // Input size is reset per frame in `detect`.
        let detector = FaceDetectorYN::create(
            model_path,
            "",
            Size::new(SHORT_RANGE_WIDTH, SHORT_RANGE_WIDTH),
            min_confidence,
            nms_threshold,
            TOP_K,
            DNN_BACKEND_DEFAULT,
            DNN_TARGET_CPU,
        )?;

        info!(
            "YuNet detector loaded from {} ({:?}, min_confidence={})",
            model_path, variant, min_confidence
        );

        Ok(YuNetDetector {
            detector,
            variant,
            min_confidence,
        })
    }
}

/// Parse the YuNet output matrix. Each row is
/// `[x, y, w, h, 10 landmark coords, score]` in inference coordinates; boxes
/// are mapped back through `scale` to the frame `detect` was called with.
fn parse_faces(faces: &Mat, scale: f64, min_confidence: f32) -> Result<Vec<BoundingBox>> {
    if faces.rows() <= 0 {
        return Ok(Vec::new());
    }
    if faces.cols() < 15 {
        warn!("YuNet output has {} columns, expected 15", faces.cols());
        return Ok(Vec::new());
    }

    let mut boxes = Vec::with_capacity(faces.rows() as usize);
    for i in 0..faces.rows() {
        let score = *faces.at_2d::<f32>(i, 14)?;
        if score < min_confidence {
            continue;
        }
        let x = f64::from(*faces.at_2d::<f32>(i, 0)?) / scale;
        let y = f64::from(*faces.at_2d::<f32>(i, 1)?) / scale;
        let w = f64::from(*faces.at_2d::<f32>(i, 2)?) / scale;
        let h = f64::from(*faces.at_2d::<f32>(i, 3)?) / scale;
        if w <= 0.0 || h <= 0.0 {
            continue;
        }
        boxes.push(BoundingBox::from_xywh_f64(x, y, w, h));
    }
    Ok(boxes)
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<BoundingBox>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let scale = self.variant.inference_scale(frame.cols());
        let resized;
        let input: &Mat = if scale < 1.0 {
            let mut small = Mat::default();
            imgproc::resize(
                frame,
                &mut small,
                Size::new(
                    (frame.cols() as f64 * scale).round() as i32,
                    (frame.rows() as f64 * scale).round() as i32,
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

        self.detector.set_input_size(input.size()?)?;

        let mut faces = Mat::default();
        if let Err(e) = self.detector.detect(input, &mut faces) {
            warn!("YuNet inference failed: {}", e);
            return Ok(Vec::new());
        }

        let boxes = parse_faces(&faces, scale, self.min_confidence)?;
        debug!("YuNet found {} face(s)", boxes.len());
        Ok(boxes)
    }
}
