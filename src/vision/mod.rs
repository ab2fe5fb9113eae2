//! Turning camera frames into cards
pub mod classify;
mod params;
mod pipeline;
pub mod primitives;
pub mod rectify;
pub mod segment;

pub use params::PipelineParams;
pub use pipeline::CardPipeline;

use image::RgbaImage;

use crate::card::{Card, CardSet};
use crate::error::PipelineError;

/// Result of one detection cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub cards: Vec<Card>,
    pub sets: Vec<CardSet>,
}

/// Anything which can find Sets in a frame
///
/// Holding one means the image primitives are ready to use, so the scheduler takes one before it
/// can start.
pub trait SetDetector {
    /// Analyse one frame
    ///
    /// The frame is only borrowed for the duration of the call.
    fn detect(&mut self, frame: &RgbaImage) -> Result<Detection, PipelineError>;

    /// Forget anything carried between frames
    ///
    /// Called when the camera changes. Only detectors which keep state between frames override
    /// this, [`CardPipeline`] looks at every frame afresh.
    fn reset_state(&mut self) {}
}
