//! Reading count, shape, colour and fill off a rectified card
use image::{GrayImage, RgbaImage};
use imageproc::contrast::{otsu_level, stretch_contrast_mut, threshold, ThresholdType};
use imageproc::point::Point;
use imageproc::stats::{min_max, MinMax};

use super::primitives::{
    approximated_contours, blur, border_mask, fill_mask, grayscale, masked_mean_luma,
    masked_mean_rgb, subtract, Outline,
};
use super::PipelineParams;
use crate::card::{Card, Color, Count, Fill, Shape};

/// Classify a rectified card
///
/// Returns `None` when the number of symbols or their shape can't be determined.
pub fn classify(card: &RgbaImage, params: &PipelineParams) -> Option<Card> {
    let _span = tracing::trace_span!("classify").entered();

    let symbols = find_symbols(card, params);
    let count = Count::from_symbols(symbols.len());
    let shape = symbols.first().map(symbol_shape);
    if count.is_none() || shape.is_none() {
        tracing::trace!("indeterminate card with {} symbols", symbols.len());
        return None;
    }

    let masks = SymbolMasks::new(card.width(), card.height(), &symbols, params.border_width);
    let color = symbol_color(card, &masks, params);
    let fill = symbol_fill(card, &masks, params);

    Card::from_parts(count, color, shape, fill)
}

/// Outlines of the symbols printed on the card, largest first
///
/// Symbol ink is darker than the card, so the threshold is inverted to make the symbols
/// foreground.
fn find_symbols(card: &RgbaImage, params: &PipelineParams) -> Vec<Outline> {
    let gray = blur(&grayscale(card), params.shape_blur_kernel);
    let mask = threshold(&gray, otsu_level(&gray), ThresholdType::BinaryInverted);

    approximated_contours(&mask, params.shape_epsilon)
        .into_iter()
        .filter(|outline| outline.area() > params.min_shape_area)
        .collect()
}

fn symbol_shape(symbol: &Outline) -> Shape {
    if !symbol.is_convex() {
        Shape::Squiggle
    } else if symbol.vertices() == 4 {
        Shape::Diamond
    } else {
        Shape::Oval
    }
}

/// Regions of the card relative to the symbols
struct SymbolMasks {
    /// Band around the symbol outlines
    border: GrayImage,
    /// Inside the symbols, clear of the band
    interior: GrayImage,
    /// Card around the symbols, clear of the band
    surround: GrayImage,
}

impl SymbolMasks {
    fn new(width: u32, height: u32, symbols: &[Outline], band: u32) -> Self {
        let contours: Vec<&[Point<i32>]> = symbols.iter().map(|s| s.contour.as_slice()).collect();

        let filled = fill_mask(width, height, &contours);
        let border = border_mask(width, height, &contours, band);
        let interior = subtract(&filled, &border);
        let mut outside = filled.clone();
        image::imageops::invert(&mut outside);
        let surround = subtract(&outside, &border);

        Self {
            border,
            interior,
            surround,
        }
    }
}

/// Colour of the symbol outlines relative to the card around them
///
/// Dividing by the card colour cancels out the colour of the light.
fn symbol_color(card: &RgbaImage, masks: &SymbolMasks, params: &PipelineParams) -> Color {
    let (Some(ink), Some(paper)) = (
        masked_mean_rgb(card, &masks.border),
        masked_mean_rgb(card, &masks.surround),
    ) else {
        return Color::Purple;
    };

    let [red, green, blue] = [0, 1, 2].map(|c| ink[c] / paper[c].max(1.0));
    color_from_channels([red, green, blue], params.color_min_diff)
}

/// Pick a colour from lighting normalised red, green and blue
///
/// Green and red need to clearly beat the other two channels, anything else is purple.
pub fn color_from_channels([red, green, blue]: [f64; 3], min_diff: f64) -> Color {
    if green - red > min_diff && green - blue > min_diff {
        Color::Green
    } else if red - green > min_diff && red - blue > min_diff {
        Color::Red
    } else {
        Color::Purple
    }
}

/// How much darker the symbol interiors are than the card
fn symbol_fill(card: &RgbaImage, masks: &SymbolMasks, params: &PipelineParams) -> Fill {
    let mut gray = grayscale(card);
    stretch_to_full_range(&mut gray);

    let symbols = masked_mean_luma(&gray, &masks.interior).unwrap_or(0.0);
    let paper = masked_mean_luma(&gray, &masks.surround).unwrap_or(0.0);

    fill_from_ratio(symbols / paper.max(1.0), params)
}

/// Map the darkest pixel to 0 and the brightest to 255
fn stretch_to_full_range(gray: &mut GrayImage) {
    if gray.is_empty() {
        return;
    }
    if let Some(&MinMax { min, max }) = min_max(&*gray).first() {
        if min < max {
            stretch_contrast_mut(gray, min, max, 0, u8::MAX);
        }
    }
}

/// Pick a fill from the ratio of symbol to card brightness
pub fn fill_from_ratio(ratio: f64, params: &PipelineParams) -> Fill {
    if ratio > params.blank_ratio {
        Fill::Blank
    } else if ratio < params.solid_ratio {
        Fill::Solid
    } else {
        Fill::Striped
    }
}

#[cfg(test)]
mod tests {
    use super::{color_from_channels, fill_from_ratio, stretch_to_full_range};
    use crate::card::{Color, Fill};
    use crate::vision::PipelineParams;
    use image::{GrayImage, Luma};

    #[test]
    fn test_color_from_channels() {
        assert_eq!(color_from_channels([0.5, 0.83, 0.5], 0.02), Color::Green);
        assert_eq!(color_from_channels([0.92, 0.5, 0.5], 0.02), Color::Red);
        assert_eq!(color_from_channels([0.73, 0.5, 0.77], 0.02), Color::Purple);
        // too close to call
        assert_eq!(color_from_channels([0.8, 0.81, 0.8], 0.02), Color::Purple);
        assert_eq!(color_from_channels([f64::NAN, 0.5, 0.5], 0.02), Color::Purple);
    }

    #[test]
    fn test_fill_from_ratio() {
        let params = PipelineParams::default();
        assert_eq!(fill_from_ratio(1.0, &params), Fill::Blank);
        assert_eq!(fill_from_ratio(0.98, &params), Fill::Blank);
        assert_eq!(fill_from_ratio(0.97, &params), Fill::Striped);
        assert_eq!(fill_from_ratio(0.5, &params), Fill::Striped);
        assert_eq!(fill_from_ratio(0.2, &params), Fill::Striped);
        assert_eq!(fill_from_ratio(0.05, &params), Fill::Solid);
    }

    #[test]
    fn test_stretch_to_full_range() {
        let mut gray = GrayImage::from_fn(3, 1, |x, _| Luma([50 + x as u8 * 50]));
        stretch_to_full_range(&mut gray);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 0)[0], 127);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);

        let mut flat = GrayImage::from_pixel(3, 3, Luma([77]));
        stretch_to_full_range(&mut flat);
        assert_eq!(flat.get_pixel(1, 1)[0], 77);
    }
}
