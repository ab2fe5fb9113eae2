use image::RgbaImage;

use super::classify::classify;
use super::rectify::rectify;
use super::segment::find_card_candidates;
use super::{Detection, PipelineParams, SetDetector};
use crate::card::{find_sets, Card};
use crate::error::PipelineError;

/// Segment, rectify, classify and validate, all on the calling thread
///
/// Every intermediate image belongs to the stage that made it and is gone before `detect`
/// returns.
#[derive(Debug, Clone, Default)]
pub struct CardPipeline {
    params: PipelineParams,
}

impl CardPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Classify every card visible in the frame
    pub fn cards(&self, frame: &RgbaImage) -> Vec<Card> {
        find_card_candidates(frame, &self.params)
            .iter()
            .filter_map(|candidate| {
                let Some(image) = rectify(frame, &candidate.quad, &self.params) else {
                    tracing::debug!("skipping degenerate card outline {:?}", candidate.quad);
                    return None;
                };
                classify(&image, &self.params)
            })
            .collect()
    }
}

impl SetDetector for CardPipeline {
    fn detect(&mut self, frame: &RgbaImage) -> Result<Detection, PipelineError> {
        let _span = tracing::debug_span!("detect").entered();

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyFrame { width, height });
        }

        let cards = self.cards(frame);
        let sets = find_sets(&cards);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let cards: Vec<String> = cards.iter().map(Card::to_string).collect();
            tracing::debug!("cards: [{}], {} sets", cards.join(" "), sets.len());
        }

        Ok(Detection { cards, sets })
    }
}

#[cfg(test)]
mod tests {
    use super::CardPipeline;
    use crate::error::PipelineError;
    use crate::vision::SetDetector;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_empty_frame_is_an_error() {
        let mut pipeline = CardPipeline::default();
        let frame = RgbaImage::new(0, 0);
        assert!(matches!(
            pipeline.detect(&frame),
            Err(PipelineError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_no_cards_no_sets() {
        let mut pipeline = CardPipeline::default();
        let frame = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        let detection = pipeline.detect(&frame).unwrap();
        assert!(detection.cards.is_empty());
        assert!(detection.sets.is_empty());
    }
}
