use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    pub fn new(device_index: u32) -> Result<Self> {
        tracing::info!("Initializing webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        tracing::info!("Webcam initialized at {}x{}", width, height);

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self, frame: &mut RgbaImage) -> Result<()> {
        let buffer = self.camera.frame().context("Failed to capture frame")?;

        let resolution = buffer.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        if frame.dimensions() != (width, height) {
            tracing::debug!("camera now delivers {}x{}", width, height);
            *frame = RgbaImage::new(width, height);
            self.width = width;
            self.height = height;
        }

        buffer
            .decode_image_to_buffer::<RgbAFormat>(frame)
            .context("Failed to decode frame")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
