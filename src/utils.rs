use opencv::{core::Size, prelude::*};
use std::time::Instant;

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};

/// Size of a captured frame, rejecting empty or zero-area frames.
pub fn frame_size(frame: &Mat) -> Result<Size> {
    if frame.empty() {
        return Err(Error::InvalidFrame("empty frame".to_string()));
    }
    let size = frame.size()?;
    if size.width <= 0 || size.height <= 0 {
        return Err(Error::InvalidFrame(format!(
            "frame has no area: {}x{}",
            size.width, size.height
        )));
    }
    Ok(size)
}

/// Pick the box with the largest area. On equal area the first one wins.
pub fn largest_by_area<I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = BoundingBox>,
{
    boxes.into_iter().fold(None, |best: Option<BoundingBox>, b| match best {
        Some(current) if current.area() >= b.area() => Some(current),
        _ => Some(b),
    })
}

/// Instantaneous frame rate from the gap between consecutive ticks.
pub struct FpsMeter {
    last: Option<Instant>,
}

impl FpsMeter {
    pub fn new() -> Self {
        FpsMeter { last: None }
    }

    /// Mark a frame. Returns `None` on the first tick.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Option<f64> {
        let fps = self.last.and_then(|prev| {
            let dt = now.duration_since(prev).as_secs_f64();
            (dt > 0.0).then(|| 1.0 / dt)
        });
        self.last = Some(now);
        fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}
