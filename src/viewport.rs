//! Smoothed virtual pan-tilt-zoom geometry.
//!
//! The subject box is low-pass filtered with a componentwise exponential moving
//! average over `(x, y, w, h)`, and a crop window with the frame's aspect ratio
//! is derived from the filtered box on every frame.

use nalgebra::SVector;
use opencv::core::Size;
use tracing::debug;

use crate::bbox::{BoundingBox, CropRectangle};
use crate::error::{Error, Result};

pub struct ViewportController {
    smoothing_factor: f64,
    margin_factor: f64,
    /// Smoothed subject box as `[x, y, w, h]`; `None` until the first sample.
    smoothed: Option<SVector<f64, 4>>,
}

impl ViewportController {
    pub fn new(smoothing_factor: f64, margin_factor: f64) -> Result<Self> {
        if !(smoothing_factor > 0.0 && smoothing_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "smoothing_factor must be in (0, 1], got {smoothing_factor}"
            )));
        }
        if !(margin_factor >= 0.0 && margin_factor.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "margin_factor must be >= 0, got {margin_factor}"
            )));
        }
        Ok(ViewportController {
            smoothing_factor,
            margin_factor,
            smoothed: None,
        })
    }

    pub fn smoothed(&self) -> Option<&SVector<f64, 4>> {
        self.smoothed.as_ref()
    }

    /// Forget the smoothed box. Only for explicit user resets; a lost subject
    /// is signalled by passing `None` to `update` instead.
    pub fn reset(&mut self) {
        self.smoothed = None;
    }

    /// Fold the latest subject box into the smoothed state and derive the crop
    /// window for a frame of `frame` size. Without a box the full frame is
    /// returned and the smoothed state is kept for when the subject reappears.
    ///
    /// The crop stays in floating point; rounding to whole pixels happens in
    /// [`CropRectangle::to_pixel_rect`] when the frame is resampled.
    pub fn update(&mut self, target: Option<BoundingBox>, frame: Size) -> CropRectangle {
        let Some(target) = target else {
            return CropRectangle::full(frame);
        };

        let sample = SVector::<f64, 4>::new(
            target.x as f64,
            target.y as f64,
            target.w as f64,
            target.h as f64,
        );
        let alpha = self.smoothing_factor;
        let smoothed = match self.smoothed {
            Some(prev) => sample * alpha + prev * (1.0 - alpha),
            None => sample,
        };
        self.smoothed = Some(smoothed);

        let crop = self.crop_for(&smoothed, frame);
        debug!(
            "viewport crop x={:.1} y={:.1} w={:.1} h={:.1}",
            crop.x, crop.y, crop.w, crop.h
        );
        crop
    }

    fn crop_for(&self, smoothed: &SVector<f64, 4>, frame: Size) -> CropRectangle {
        let (frame_w, frame_h) = (frame.width as f64, frame.height as f64);
        let (sx, sy, sw, sh) = (smoothed[0], smoothed[1], smoothed[2], smoothed[3]);

        let center_x = sx + sw / 2.0;
        let center_y = sy + sh / 2.0;

        // Sized from the larger side so no face pose is clipped. Capped at the
        // frame height: the crop shares the frame's aspect ratio, so that also
        // keeps the width within the frame and translation alone can contain it.
        let crop_dim = sw.max(sh) * (1.0 + self.margin_factor);
        let crop_h = crop_dim.min(frame_h);
        let crop_w = (crop_h * (frame_w / frame_h)).min(frame_w);

        let mut crop_x = center_x - crop_w / 2.0;
        let mut crop_y = center_y - crop_h / 2.0;

        if crop_x < 0.0 {
            crop_x = 0.0;
        }
        if crop_y < 0.0 {
            crop_y = 0.0;
        }
        if crop_x + crop_w > frame_w {
            crop_x = frame_w - crop_w;
        }
        if crop_y + crop_h > frame_h {
            crop_y = frame_h - crop_h;
        }
        crop_x = crop_x.max(0.0);
        crop_y = crop_y.max(0.0);

        CropRectangle::new(crop_x, crop_y, crop_w, crop_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-9;

    fn hd() -> Size {
        Size::new(1280, 720)
    }

    fn assert_contained(crop: &CropRectangle, frame: Size) {
        assert!(crop.x >= 0.0, "x = {}", crop.x);
        assert!(crop.y >= 0.0, "y = {}", crop.y);
        assert!(crop.x + crop.w <= frame.width as f64 + EPS, "{:?}", crop);
        assert!(crop.y + crop.h <= frame.height as f64 + EPS, "{:?}", crop);
    }

    #[test]
    fn test_no_box_returns_full_frame_and_keeps_state() {
        let mut vp = ViewportController::new(0.15, 0.6).unwrap();
        assert_eq!(vp.update(None, hd()), CropRectangle::full(hd()));
        assert!(vp.smoothed().is_none());

        vp.update(Some(BoundingBox::new(600, 300, 100, 120)), hd());
        let before = *vp.smoothed().unwrap();
        assert_eq!(vp.update(None, hd()), CropRectangle::full(hd()));
        assert_eq!(*vp.smoothed().unwrap(), before);
    }

    #[test]
    fn test_first_sample_is_taken_verbatim() {
        let mut vp = ViewportController::new(0.15, 0.6).unwrap();
        vp.update(Some(BoundingBox::new(600, 300, 100, 120)), hd());
        assert_eq!(*vp.smoothed().unwrap(), SVector::<f64, 4>::new(600.0, 300.0, 100.0, 120.0));
    }

    #[test]
    fn test_ema_is_componentwise() {
        let mut vp = ViewportController::new(0.5, 0.0).unwrap();
        vp.update(Some(BoundingBox::new(100, 100, 50, 50)), hd());
        vp.update(Some(BoundingBox::new(200, 150, 100, 60)), hd());
        let s = vp.smoothed().unwrap();
        assert_relative_eq!(s[0], 150.0);
        assert_relative_eq!(s[1], 125.0);
        assert_relative_eq!(s[2], 75.0);
        assert_relative_eq!(s[3], 55.0);
    }

    #[test]
    fn test_converges_geometrically() {
        let alpha = 0.2;
        let mut vp = ViewportController::new(alpha, 0.6).unwrap();
        vp.update(Some(BoundingBox::new(100, 100, 80, 80)), hd());
        let target = BoundingBox::new(400, 200, 120, 100);
        let initial = SVector::<f64, 4>::new(100.0, 100.0, 80.0, 80.0);
        let goal = SVector::<f64, 4>::new(400.0, 200.0, 120.0, 100.0);

        for n in 1..=20 {
            vp.update(Some(target), hd());
            let expected = (initial - goal).norm() * (1.0 - alpha).powi(n);
            assert_relative_eq!((vp.smoothed().unwrap() - goal).norm(), expected, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_smoothing_factor_one_tracks_exactly() {
        let mut vp = ViewportController::new(1.0, 0.6).unwrap();
        vp.update(Some(BoundingBox::new(100, 100, 80, 80)), hd());
        vp.update(Some(BoundingBox::new(500, 300, 60, 90)), hd());
        assert_eq!(*vp.smoothed().unwrap(), SVector::<f64, 4>::new(500.0, 300.0, 60.0, 90.0));
    }

    #[test]
    fn test_loss_resumes_from_previous_value() {
        let mut vp = ViewportController::new(0.5, 0.6).unwrap();
        vp.update(Some(BoundingBox::new(100, 100, 80, 80)), hd());
        vp.update(None, hd());
        vp.update(None, hd());
        vp.update(Some(BoundingBox::new(200, 100, 80, 80)), hd());
        assert_relative_eq!(vp.smoothed().unwrap()[0], 150.0);
    }

    #[test]
    fn test_crop_is_centered_with_margin_and_frame_aspect() {
        let mut vp = ViewportController::new(1.0, 0.5).unwrap();
        let crop = vp.update(Some(BoundingBox::new(600, 300, 80, 100)), hd());
        // crop_h = max(80, 100) * 1.5, crop_w = crop_h * 16/9
        assert_relative_eq!(crop.h, 150.0);
        assert_relative_eq!(crop.w, 150.0 * 1280.0 / 720.0);
        assert_relative_eq!(crop.x + crop.w / 2.0, 640.0);
        assert_relative_eq!(crop.y + crop.h / 2.0, 350.0);
    }

    #[test]
    fn test_crop_stays_fractional_until_pixel_rect() {
        let mut vp = ViewportController::new(1.0, 0.5).unwrap();
        let crop = vp.update(Some(BoundingBox::new(600, 300, 80, 100)), hd());
        assert_relative_eq!(crop.x, 640.0 - 400.0 / 3.0, epsilon = EPS);
        assert!(crop.w.fract() > 0.0);
        assert_eq!(crop.to_pixel_rect(hd()), Some(opencv::core::Rect::new(507, 275, 266, 150)));
    }

    #[test]
    fn test_zero_margin_is_tightest() {
        let mut vp = ViewportController::new(1.0, 0.0).unwrap();
        let crop = vp.update(Some(BoundingBox::new(600, 300, 90, 90)), hd());
        assert_relative_eq!(crop.h, 90.0);
    }

    #[test]
    fn test_crop_is_shifted_inside_near_edges() {
        let mut vp = ViewportController::new(1.0, 0.6).unwrap();
        let crop = vp.update(Some(BoundingBox::new(0, 0, 60, 60)), hd());
        assert_relative_eq!(crop.x, 0.0);
        assert_relative_eq!(crop.y, 0.0);
        assert_relative_eq!(crop.h, 96.0);

        vp.reset();
        let crop = vp.update(Some(BoundingBox::new(1220, 660, 60, 60)), hd());
        assert_relative_eq!(crop.x + crop.w, 1280.0);
        assert_relative_eq!(crop.y + crop.h, 720.0);
        assert_relative_eq!(crop.h, 96.0);
    }

    #[test]
    fn test_oversized_crop_is_capped_to_full_frame() {
        let mut vp = ViewportController::new(1.0, 0.6).unwrap();
        let crop = vp.update(Some(BoundingBox::new(200, 100, 600, 600)), hd());
        assert_contained(&crop, hd());
        assert!(crop.is_full(hd()));
        assert_relative_eq!(crop.w / crop.h, 1280.0 / 720.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aspect_and_containment_across_frames_and_boxes() {
        let frames = [Size::new(1280, 720), Size::new(640, 480), Size::new(480, 640), Size::new(101, 77)];
        let boxes = [
            BoundingBox::new(0, 0, 1, 1),
            BoundingBox::new(10, 20, 30, 80),
            BoundingBox::new(50, 5, 40, 10),
            BoundingBox::new(60, 50, 41, 27),
            BoundingBox::new(0, 0, 2000, 2000),
        ];
        for frame in frames {
            for margin in [0.0, 0.6, 3.0] {
                let mut vp = ViewportController::new(0.3, margin).unwrap();
                for b in boxes {
                    let crop = vp.update(Some(b), frame);
                    assert_contained(&crop, frame);
                    assert_relative_eq!(
                        crop.w / crop.h,
                        frame.width as f64 / frame.height as f64,
                        epsilon = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut vp = ViewportController::new(0.5, 0.6).unwrap();
        vp.update(Some(BoundingBox::new(100, 100, 80, 80)), hd());
        vp.reset();
        assert!(vp.smoothed().is_none());
        vp.update(Some(BoundingBox::new(300, 100, 80, 80)), hd());
        assert_relative_eq!(vp.smoothed().unwrap()[0], 300.0);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(ViewportController::new(0.0, 0.6).is_err());
        assert!(ViewportController::new(1.2, 0.6).is_err());
        assert!(ViewportController::new(0.5, -1.0).is_err());
        assert!(ViewportController::new(1.0, 0.0).is_ok());
    }
}
