use opencv::core::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Integer face box in pixel coordinates of one frame resolution: top-left + size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Clamp into `[0, frame.width] x [0, frame.height]` by shrinking the
    /// size. The top-left corner only moves when it lies outside the frame.
    /// Returns `None` if nothing of the box remains inside the frame.
    pub fn clamp_to(&self, frame: Size) -> Option<BoundingBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.x.saturating_add(self.w).min(frame.width);
        let y2 = self.y.saturating_add(self.h).min(frame.height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Map from a frame downscaled by `scale` back to the full-resolution frame.
    pub fn unscale(&self, scale: f64) -> BoundingBox {
        BoundingBox::new(
            (self.x as f64 / scale) as i32,
            (self.y as f64 / scale) as i32,
            (self.w as f64 / scale) as i32,
            (self.h as f64 / scale) as i32,
        )
    }

    /// Truncating conversion from floating-point capability output.
    pub fn from_xywh_f64(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(x as i32, y as i32, w as i32, h as i32)
    }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        BoundingBox::new(rect.x, rect.y, rect.width, rect.height)
    }
}

impl From<BoundingBox> for Rect {
    fn from(bbox: BoundingBox) -> Self {
        Rect::new(bbox.x, bbox.y, bbox.w, bbox.h)
    }
}

/// Floating-point crop window in source frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRectangle {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl CropRectangle {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The whole frame, i.e. no zoom.
    pub fn full(frame: Size) -> Self {
        Self::new(0.0, 0.0, frame.width as f64, frame.height as f64)
    }

    pub fn is_full(&self, frame: Size) -> bool {
        self.to_pixel_rect(frame) == Some(Rect::new(0, 0, frame.width, frame.height))
    }

    /// Round to whole pixels and intersect with the frame. The far corner is
    /// clipped to the frame edge; a rectangle left without area yields `None`.
    pub fn to_pixel_rect(&self, frame: Size) -> Option<Rect> {
        if !(self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()) {
            return None;
        }
        let x1 = (self.x.round() as i32).max(0);
        let y1 = (self.y.round() as i32).max(0);
        let x2 = ((self.x + self.w).round() as i32).min(frame.width);
        let y2 = ((self.y + self.h).round() as i32).min(frame.height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_identity() {
        let frame = Size::new(640, 480);
        let b = BoundingBox::new(10, 20, 100, 50);
        assert_eq!(b.clamp_to(frame), Some(b));
    }

    #[test]
    fn test_clamp_shrinks_far_edge_and_keeps_anchor() {
        let frame = Size::new(640, 480);
        let b = BoundingBox::new(600, 450, 100, 100);
        assert_eq!(b.clamp_to(frame), Some(BoundingBox::new(600, 450, 40, 30)));
    }

    #[test]
    fn test_clamp_negative_origin_keeps_far_edge() {
        let frame = Size::new(640, 480);
        let b = BoundingBox::new(-10, -5, 50, 40);
        assert_eq!(b.clamp_to(frame), Some(BoundingBox::new(0, 0, 40, 35)));
    }

    #[test]
    fn test_clamp_outside_frame_is_none() {
        let frame = Size::new(640, 480);
        assert_eq!(BoundingBox::new(700, 10, 20, 20).clamp_to(frame), None);
        assert_eq!(BoundingBox::new(10, 10, 0, 20).clamp_to(frame), None);
    }

    #[test]
    fn test_unscale() {
        let b = BoundingBox::new(32, 16, 64, 48);
        assert_eq!(b.unscale(0.5), BoundingBox::new(64, 32, 128, 96));
        assert_eq!(b.unscale(1.0), b);
    }

    #[test]
    fn test_from_float_truncates() {
        assert_eq!(
            BoundingBox::from_xywh_f64(21.8, 10.9, 59.99, 80.0),
            BoundingBox::new(21, 10, 59, 80)
        );
    }

    #[test]
    fn test_pixel_rect_clips_far_corner() {
        let frame = Size::new(100, 50);
        let crop = CropRectangle::new(60.4, 10.0, 50.0, 25.0);
        assert_eq!(crop.to_pixel_rect(frame), Some(Rect::new(60, 10, 40, 25)));
    }

    #[test]
    fn test_pixel_rect_degenerate() {
        let frame = Size::new(100, 50);
        assert_eq!(CropRectangle::new(10.0, 10.0, 0.2, 10.0).to_pixel_rect(frame), None);
        assert_eq!(CropRectangle::new(120.0, 10.0, 10.0, 10.0).to_pixel_rect(frame), None);
        assert_eq!(CropRectangle::new(f64::NAN, 0.0, 10.0, 10.0).to_pixel_rect(frame), None);
    }

    #[test]
    fn test_full_crop() {
        let frame = Size::new(1280, 720);
        let crop = CropRectangle::full(frame);
        assert!(crop.is_full(frame));
        assert!(!CropRectangle::new(1.0, 0.0, 1279.0, 720.0).is_full(frame));
    }
}
