use opencv::{core::Mat, imgproc, prelude::*};
use tracing::debug;

use crate::bbox::CropRectangle;
use crate::error::Result;
use crate::utils::frame_size;

/// Cut `crop` out of `frame` and scale it back up to the frame's own size.
///
/// A crop that covers the whole frame returns an untouched copy. A crop with
/// no area left after rounding and intersecting with the frame also returns
/// the source unchanged rather than failing.
pub fn resample(frame: &Mat, crop: &CropRectangle) -> Result<Mat> {
    let size = frame_size(frame)?;

    if crop.is_full(size) {
        return Ok(frame.try_clone()?);
    }
    let Some(rect) = crop.to_pixel_rect(size) else {
        debug!("degenerate crop {:?}, passing frame through", crop);
        return Ok(frame.try_clone()?);
    };

    let roi = Mat::roi(frame, rect)?.try_clone()?;
    let mut zoomed = Mat::default();
    imgproc::resize(&roi, &mut zoomed, size, 0.0, 0.0, imgproc::INTER_LINEAR)?;
    Ok(zoomed)
}
