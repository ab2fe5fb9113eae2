//! Warping a card outline into an upright, fixed size card image
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point;

use super::segment::Quad;
use super::PipelineParams;

/// Filled in where the card outline reaches past the frame
const BORDER: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Order quad corners clockwise from the corner that becomes the card's top left
///
/// Corners are split into a top and a bottom pair by height, then into left and right. When the
/// top edge is the longer one the card is lying on its side and the order is turned one step, so
/// the rectified card always comes out portrait. Cards turned more than about 45 degrees can come
/// out mirrored or rotated.
pub fn order_corners(quad: &Quad) -> [Point<i32>; 4] {
    let mut points = *quad;
    points.sort_by_key(|p| p.y);

    let (tl, tr) = left_right(points[0], points[1]);
    let (bl, br) = left_right(points[2], points[3]);

    if distance(points[0], points[1]) > distance(points[0], points[2]) {
        [tr, br, bl, tl]
    } else {
        [tl, tr, br, bl]
    }
}

fn left_right(a: Point<i32>, b: Point<i32>) -> (Point<i32>, Point<i32>) {
    if a.x <= b.x {
        (a, b)
    } else {
        (b, a)
    }
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    ((a.x - b.x) as f64).hypot((a.y - b.y) as f64)
}

/// Cut the card out of the frame as if seen head on
///
/// Returns `None` for outlines no perspective transform can map onto a rectangle.
pub fn rectify(frame: &RgbaImage, quad: &Quad, params: &PipelineParams) -> Option<RgbaImage> {
    let _span = tracing::trace_span!("rectify").entered();

    let (width, height) = (params.card_width as f32, params.card_height as f32);
    let from = order_corners(quad).map(|p| (p.x as f32, p.y as f32));
    let to = [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)];

    let projection = Projection::from_control_points(from, to)?;
    let mut card = RgbaImage::new(params.card_width, params.card_height);
    warp_into(frame, &projection, Interpolation::Bilinear, BORDER, &mut card);
    Some(card)
}
