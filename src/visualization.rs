use opencv::{
    core::{Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

use crate::bbox::BoundingBox;

const FPS_ORIGIN: (i32, i32) = (20, 40);

/// Draw the instantaneous frame rate in the top-left corner.
pub fn draw_fps(frame: &mut Mat, fps: f64) -> opencv::Result<()> {
    let text = format!("FPS: {}", fps.round() as i64);
    imgproc::put_text(
        frame,
        &text,
        Point::new(FPS_ORIGIN.0, FPS_ORIGIN.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        Scalar::new(0.0, 255.0, 0.0, 0.0), // Green (BGR)
        2,
        imgproc::LINE_8,
        false,
    )
}

/// Outline the located subject. Only meaningful on the unzoomed frame.
pub fn draw_subject(frame: &mut Mat, subject: &BoundingBox) -> opencv::Result<()> {
    imgproc::rectangle(
        frame,
        Rect::from(*subject),
        Scalar::new(255.0, 128.0, 0.0, 0.0),
        2,
        imgproc::LINE_8,
        0,
    )
}
