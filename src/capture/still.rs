use super::{copy_into, CaptureSource};
use crate::error::CaptureError;
use anyhow::Result;
use image::RgbaImage;
use std::path::Path;

/// Replays still images as if they came from a camera
pub struct StillFrames {
    images: Vec<RgbaImage>,
    next: usize,
    looping: bool,
}

impl StillFrames {
    /// Load every image up front so a bad path fails before detection starts
    pub fn open<P: AsRef<Path>>(paths: &[P], looping: bool) -> Result<Self, CaptureError> {
        let images = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                tracing::info!("Loading {}", path.display());
                image::open(path)
                    .map(|image| image.to_rgba8())
                    .map_err(|source| CaptureError::Load {
                        path: path.to_path_buf(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_images(images, looping)
    }

    pub fn from_images(images: Vec<RgbaImage>, looping: bool) -> Result<Self, CaptureError> {
        if images.is_empty() {
            return Err(CaptureError::NoImages);
        }
        Ok(Self {
            images,
            next: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl CaptureSource for StillFrames {
    fn capture_frame(&mut self, frame: &mut RgbaImage) -> Result<()> {
        if self.next == self.images.len() {
            if !self.looping {
                return Err(CaptureError::Exhausted.into());
            }
            self.next = 0;
        }

        copy_into(frame, &self.images[self.next]);
        self.next += 1;
        Ok(())
    }

    /// Size of the next image to be captured
    fn resolution(&self) -> (u32, u32) {
        let index = if self.next < self.images.len() {
            self.next
        } else {
            0
        };
        self.images[index].dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::StillFrames;
    use crate::capture::CaptureSource;
    use crate::error::CaptureError;
    use image::{Rgba, RgbaImage};

    fn images() -> Vec<RgbaImage> {
        vec![
            RgbaImage::from_pixel(4, 3, Rgba([1, 1, 1, 255])),
            RgbaImage::from_pixel(6, 2, Rgba([2, 2, 2, 255])),
        ]
    }

    #[test]
    fn test_no_images() {
        assert!(matches!(
            StillFrames::from_images(vec![], false),
            Err(CaptureError::NoImages)
        ));
    }

    #[test]
    fn test_plays_once_then_exhausted() {
        let mut source = StillFrames::from_images(images(), false).unwrap();
        assert_eq!(source.resolution(), (4, 3));

        let mut frame = RgbaImage::new(4, 3);
        source.capture_frame(&mut frame).unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgba([1, 1, 1, 255]));

        source.capture_frame(&mut frame).unwrap();
        assert_eq!(frame.dimensions(), (6, 2));
        assert_eq!(frame.get_pixel(5, 1), &Rgba([2, 2, 2, 255]));

        let err = source.capture_frame(&mut frame).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::Exhausted)
        ));
    }

    #[test]
    fn test_looping() {
        let mut source = StillFrames::from_images(images(), true).unwrap();
        let mut frame = RgbaImage::new(0, 0);
        for _ in 0..5 {
            source.capture_frame(&mut frame).unwrap();
        }
        assert_eq!(frame.get_pixel(0, 0), &Rgba([1, 1, 1, 255]));
        assert_eq!(source.resolution(), (6, 2));
    }

    #[test]
    fn test_missing_file() {
        let result = StillFrames::open(&["/nonexistent/table.png"], false);
        assert!(matches!(result, Err(CaptureError::Load { .. })));
    }
}
