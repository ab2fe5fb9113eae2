//! Finding card shaped regions in a frame
use image::RgbaImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::point::Point;

use super::primitives::{approximated_contours, blur, grayscale, Outline};
use super::PipelineParams;

/// Four corners of a candidate card outline, in frame coordinates
pub type Quad = [Point<i32>; 4];

/// A region of the frame which might be a card
#[derive(Debug, Clone)]
pub struct CardCandidate {
    pub contour: Vec<Point<i32>>,
    pub quad: Quad,
}

/// Find the card candidates in a frame, largest first
///
/// Cards are bright on a darker table, so after an automatic threshold every card is a separate
/// foreground blob whose outline approximates to a convex quadrilateral.
pub fn find_card_candidates(frame: &RgbaImage, params: &PipelineParams) -> Vec<CardCandidate> {
    let _span = tracing::debug_span!("segment").entered();

    let gray = blur(&grayscale(frame), params.card_blur_kernel);
    let binary = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);

    let candidates: Vec<CardCandidate> = approximated_contours(&binary, params.card_epsilon)
        .into_iter()
        .filter(|outline| might_be_card(outline, params))
        .filter_map(|Outline { contour, approximation }| {
            let quad: Quad = approximation.as_slice().try_into().ok()?;
            Some(CardCandidate { contour, quad })
        })
        .take(params.max_cards)
        .collect();

    tracing::debug!("{} card candidates", candidates.len());
    candidates
}

fn might_be_card(outline: &Outline, params: &PipelineParams) -> bool {
    outline.vertices() == 4 && outline.area() > params.min_card_area && outline.is_convex()
}

#[cfg(test)]
mod tests {
    use super::find_card_candidates;
    use crate::vision::primitives::{approximated_contours, grayscale};
    use crate::vision::PipelineParams;
    use image::{Rgba, RgbaImage};
    use imageproc::contrast::{otsu_level, threshold, ThresholdType};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::point::Point;
    use imageproc::rect::Rect;

    const TABLE: Rgba<u8> = Rgba([20, 20, 20, 255]);
    const WHITE: Rgba<u8> = Rgba([240, 240, 240, 255]);

    #[test]
    fn test_black_frame_has_no_candidates() {
        let frame = RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]));
        assert!(find_card_candidates(&frame, &PipelineParams::default()).is_empty());
    }

    #[test]
    fn test_only_large_convex_quads() {
        let mut frame = RgbaImage::from_pixel(640, 480, TABLE);
        draw_filled_rect_mut(&mut frame, Rect::at(20, 20).of_size(100, 155), WHITE);
        draw_filled_rect_mut(&mut frame, Rect::at(200, 20).of_size(120, 186), WHITE);
        // too small
        draw_filled_rect_mut(&mut frame, Rect::at(400, 20).of_size(15, 15), WHITE);
        // wrong number of corners
        draw_filled_circle_mut(&mut frame, (500, 300), 60, WHITE);
        draw_polygon_mut(
            &mut frame,
            &[Point::new(40, 300), Point::new(200, 300), Point::new(120, 440)],
            WHITE,
        );
        // four corners but not convex
        draw_polygon_mut(
            &mut frame,
            &[
                Point::new(360, 260),
                Point::new(440, 460),
                Point::new(360, 380),
                Point::new(280, 460),
            ],
            WHITE,
        );

        let candidates = find_card_candidates(&frame, &PipelineParams::default());
        assert_eq!(candidates.len(), 2);

        // largest first
        let xs: Vec<i32> = candidates[0].quad.iter().map(|p| p.x).collect();
        assert!(xs.iter().all(|&x| (199..=320).contains(&x)), "{:?}", xs);
        let xs: Vec<i32> = candidates[1].quad.iter().map(|p| p.x).collect();
        assert!(xs.iter().all(|&x| (19..=120).contains(&x)), "{:?}", xs);
    }

    #[test]
    fn test_concave_quad_is_rejected() {
        let mut frame = RgbaImage::from_pixel(640, 480, TABLE);
        draw_polygon_mut(
            &mut frame,
            &[
                Point::new(360, 260),
                Point::new(440, 460),
                Point::new(360, 380),
                Point::new(280, 460),
            ],
            WHITE,
        );

        let params = PipelineParams::default();
        let gray = grayscale(&frame);
        let binary = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);
        let outlines = approximated_contours(&binary, params.card_epsilon);
        assert_eq!(outlines.len(), 1);
        assert_eq!(outlines[0].vertices(), 4);
        assert!(outlines[0].area() > params.min_card_area);
        assert!(!outlines[0].is_convex());

        assert!(find_card_candidates(&frame, &params).is_empty());
    }

    #[test]
    fn test_at_most_max_cards() {
        let mut frame = RgbaImage::from_pixel(400, 300, TABLE);
        for row in 0..4 {
            for col in 0..5 {
                draw_filled_rect_mut(
                    &mut frame,
                    Rect::at(10 + col * 78, 10 + row * 72).of_size(40, 50),
                    WHITE,
                );
            }
        }

        let params = PipelineParams::default();
        assert_eq!(find_card_candidates(&frame, &params).len(), 18);

        let params = PipelineParams {
            max_cards: 3,
            ..PipelineParams::default()
        };
        assert_eq!(find_card_candidates(&frame, &params).len(), 3);
    }
}
