//! Rendering flat, evenly lit Set cards and tables to run the pipeline on
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_ellipse_mut, draw_polygon_mut};
use imageproc::morphology::erode;
use imageproc::point::Point;
use set_spotter::card::{Card, Color, Count, Fill, Shape};

pub const CARD_WIDTH: u32 = 200;
pub const CARD_HEIGHT: u32 = 310;

const PAPER: Rgba<u8> = Rgba([245, 245, 245, 255]);
const TABLE: Rgba<u8> = Rgba([30, 30, 30, 255]);
const OUTLINE: u8 = 3;

pub fn ink(color: Color) -> Rgba<u8> {
    match color {
        Color::Green => Rgba([0, 160, 0, 255]),
        Color::Red => Rgba([200, 0, 0, 255]),
        Color::Purple => Rgba([110, 0, 130, 255]),
    }
}

/// Vertical centres of the symbols on an upright card
pub fn symbol_centres(count: Count) -> Vec<i32> {
    match count {
        Count::One => vec![155],
        Count::Two => vec![117, 193],
        Count::Three => vec![80, 155, 230],
    }
}

/// An upright card with its symbols 120 by 50 pixels, centred horizontally
pub fn render_card(card: Card) -> RgbaImage {
    render_symbols(
        card.shape,
        card.color,
        card.fill,
        &symbol_centres(card.count),
    )
}

/// An upright card with a symbol centred at each of the given heights
pub fn render_symbols(shape: Shape, color: Color, fill: Fill, centres: &[i32]) -> RgbaImage {
    let mut mask = GrayImage::new(CARD_WIDTH, CARD_HEIGHT);
    for &cy in centres {
        draw_symbol(&mut mask, shape, cy);
    }
    let interior = erode(&mask, Norm::LInf, OUTLINE);

    let ink = ink(color);
    RgbaImage::from_fn(CARD_WIDTH, CARD_HEIGHT, |x, y| {
        let inside = mask.get_pixel(x, y)[0] > 0;
        let outline = inside && interior.get_pixel(x, y)[0] == 0;
        let painted = match fill {
            Fill::Blank => outline,
            Fill::Striped => outline || (inside && y % 6 < 2),
            Fill::Solid => inside,
        };
        if painted {
            ink
        } else {
            PAPER
        }
    })
}

fn draw_symbol(mask: &mut GrayImage, shape: Shape, cy: i32) {
    let white = Luma([255]);
    let p = |x: i32, y: i32| Point::new(x, y);
    match shape {
        Shape::Oval => draw_filled_ellipse_mut(mask, (100, cy), 60, 25, white),
        Shape::Diamond => draw_polygon_mut(
            mask,
            &[p(40, cy), p(100, cy - 25), p(160, cy), p(100, cy + 25)],
            white,
        ),
        // a bow tie stands in for the wavy outline, what matters is that it isn't convex
        Shape::Squiggle => draw_polygon_mut(
            mask,
            &[
                p(40, cy - 25),
                p(100, cy - 5),
                p(160, cy - 25),
                p(160, cy + 25),
                p(100, cy + 5),
                p(40, cy + 25),
            ],
            white,
        ),
    }
}

/// A dark table of the given size with card images laid on it at the given positions
pub fn render_table(width: u32, height: u32, cards: &[(RgbaImage, i64, i64)]) -> RgbaImage {
    let mut table = RgbaImage::from_pixel(width, height, TABLE);
    for (card, x, y) in cards {
        imageops::overlay(&mut table, card, *x, *y);
    }
    table
}

/// Every card of the deck
pub fn deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(81);
    for count in [Count::One, Count::Two, Count::Three] {
        for color in [Color::Green, Color::Red, Color::Purple] {
            for shape in [Shape::Oval, Shape::Diamond, Shape::Squiggle] {
                for fill in [Fill::Blank, Fill::Striped, Fill::Solid] {
                    cards.push(Card::new(count, color, shape, fill));
                }
            }
        }
    }
    cards
}
