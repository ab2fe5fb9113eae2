mod still;
#[cfg(feature = "webcam")]
mod v4l_capture;

pub use still::StillFrames;
#[cfg(feature = "webcam")]
pub use v4l_capture::WebcamCapture;

use anyhow::Result;
use image::RgbaImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame into `frame`
    ///
    /// The frame is reallocated when its size doesn't match the captured image. Sources which run
    /// out of frames fail with [`CaptureError::Exhausted`](crate::error::CaptureError::Exhausted).
    fn capture_frame(&mut self, frame: &mut RgbaImage) -> Result<()>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

impl<C: CaptureSource + ?Sized> CaptureSource for Box<C> {
    fn capture_frame(&mut self, frame: &mut RgbaImage) -> Result<()> {
        (**self).capture_frame(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}

/// Copy `image` into `frame`, keeping the allocation when the sizes match
pub(crate) fn copy_into(frame: &mut RgbaImage, image: &RgbaImage) {
    if frame.dimensions() == image.dimensions() {
        frame.copy_from_slice(image.as_raw());
    } else {
        *frame = image.clone();
    }
}
