/// Tuning of the card pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    /// Gaussian kernel size applied to the frame before thresholding
    pub card_blur_kernel: u32,
    /// Polygon approximation tolerance as a fraction of the card contour perimeter
    pub card_epsilon: f64,
    /// Smallest quadrilateral area in px² which might be a card
    pub min_card_area: f64,
    /// Most cards analysed per frame
    pub max_cards: usize,

    /// Size of the rectified card image
    pub card_width: u32,
    pub card_height: u32,

    /// Gaussian kernel size applied to a rectified card before thresholding
    pub shape_blur_kernel: u32,
    /// Polygon approximation tolerance as a fraction of the symbol contour perimeter
    pub shape_epsilon: f64,
    /// Smallest contour area in px² which might be a symbol
    pub min_shape_area: f64,

    /// Width of the band around symbol outlines used to sample colour
    pub border_width: u32,
    /// How much one normalised channel must beat the others by
    pub color_min_diff: f64,
    /// Symbol to card brightness ratio above which a symbol is empty
    pub blank_ratio: f64,
    /// Symbol to card brightness ratio below which a symbol is filled in
    pub solid_ratio: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            card_blur_kernel: 5,
            card_epsilon: 0.04,
            min_card_area: 500.0,
            max_cards: 18,

            card_width: 200,
            card_height: 310,

            shape_blur_kernel: 3,
            shape_epsilon: 0.02,
            min_shape_area: 2000.0,

            border_width: 10,
            color_min_diff: 0.02,
            blank_ratio: 0.97,
            solid_ratio: 0.2,
        }
    }
}
