//! Image primitives the pipeline is built from
//!
//! Mostly thin wrappers over `imageproc` which fix the conventions the pipeline relies on: binary
//! images are 0/255, contours are closed and never repeat their first point, and polygons are
//! approximated without depending on where contour tracing happened to start.
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::morphology::dilate;
use imageproc::point::Point;

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// A closed contour and its polygon approximation
#[derive(Debug, Clone)]
pub struct Outline {
    pub contour: Vec<Point<i32>>,
    pub approximation: Vec<Point<i32>>,
}

impl Outline {
    /// Area enclosed by the approximation
    pub fn area(&self) -> f64 {
        contour_area(&self.approximation)
    }

    pub fn is_convex(&self) -> bool {
        is_convex(&self.approximation)
    }

    pub fn vertices(&self) -> usize {
        self.approximation.len()
    }
}

pub fn grayscale(image: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Sigma for a Gaussian kernel of the given size, as OpenCV picks it when none is given
pub fn blur_sigma(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn blur(gray: &GrayImage, kernel: u32) -> GrayImage {
    if kernel <= 1 {
        return gray.clone();
    }
    gaussian_blur_f32(gray, blur_sigma(kernel))
}

/// Outer borders of the top level foreground regions
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// External contours, largest first, each with a polygon approximation
///
/// `epsilon_ratio` is the approximation tolerance as a fraction of each contour's perimeter.
pub fn approximated_contours(binary: &GrayImage, epsilon_ratio: f64) -> Vec<Outline> {
    let mut contours: Vec<(f64, Vec<Point<i32>>)> = external_contours(binary)
        .into_iter()
        .map(|contour| (contour_area(&contour), contour))
        .collect();
    contours.sort_by(|a, b| b.0.total_cmp(&a.0));

    contours
        .into_iter()
        .map(|(_, contour)| {
            let epsilon = perimeter(&contour) * epsilon_ratio;
            let approximation = approximate_closed(&contour, epsilon);
            Outline {
                contour,
                approximation,
            }
        })
        .collect()
}

/// Length of a closed contour
pub fn perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

/// Douglas-Peucker approximation of a closed curve
///
/// The curve is split at two extreme points (the point furthest from the start, and the point
/// furthest from that) and each half is simplified as an open chain. Extreme points are always
/// vertices of the result, so a quadrilateral keeps exactly its corners wherever tracing started.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let a = furthest_from(points, points[0]);
    let b = furthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (i, j) = (a.min(b), a.max(b));

    let mut polygon = approximate_polygon_dp(&points[i..=j], epsilon, false);
    polygon.pop();

    let wrapped: Vec<Point<i32>> = points[j..].iter().chain(&points[..=i]).copied().collect();
    let mut rest = approximate_polygon_dp(&wrapped, epsilon, false);
    rest.pop();

    polygon.append(&mut rest);
    polygon
}

fn furthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_distance = -1;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        let distance = dx * dx + dy * dy;
        if distance > best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Whether every turn of the polygon goes the same way
pub fn is_convex(polygon: &[Point<i32>]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut turn = 0;
    for i in 0..n {
        let (a, b, c) = (polygon[i], polygon[(i + 1) % n], polygon[(i + 2) % n]);
        let cross = (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        if cross == 0 {
            continue;
        }
        if turn == 0 {
            turn = cross.signum();
        } else if cross.signum() != turn {
            return false;
        }
    }
    turn != 0
}

/// Mask with the interiors of the contours set
pub fn fill_mask(width: u32, height: u32, contours: &[&[Point<i32>]]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for contour in contours {
        let mut polygon = contour.to_vec();
        // drawing rejects polygons which repeat their first point
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        if polygon.len() >= 3 {
            draw_polygon_mut(&mut mask, &polygon, FOREGROUND);
        }
        put_points(&mut mask, contour);
    }
    mask
}

/// Mask with a band roughly `band` pixels wide centred on the contours
pub fn border_mask(width: u32, height: u32, contours: &[&[Point<i32>]], band: u32) -> GrayImage {
    let mut outline = GrayImage::new(width, height);
    for contour in contours {
        put_points(&mut outline, contour);
    }
    let radius = (band / 2).min(u8::MAX as u32) as u8;
    if radius == 0 {
        return outline;
    }
    dilate(&outline, Norm::LInf, radius)
}

fn put_points(mask: &mut GrayImage, points: &[Point<i32>]) {
    let (width, height) = mask.dimensions();
    for p in points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
            mask.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
        }
    }
}

/// Pixels set in `mask` but not in `exclude`
pub fn subtract(mask: &GrayImage, exclude: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for (pixel, excluded) in out.pixels_mut().zip(exclude.pixels()) {
        if excluded[0] > 0 {
            *pixel = BACKGROUND;
        }
    }
    out
}

/// Mean red, green and blue over the pixels set in `mask`
pub fn masked_mean_rgb(image: &RgbaImage, mask: &GrayImage) -> Option<[f64; 3]> {
    let mut sum = [0_u64; 3];
    let mut n = 0_u64;
    for (pixel, m) in image.pixels().zip(mask.pixels()) {
        if m[0] > 0 {
            for (total, &channel) in sum.iter_mut().zip(&pixel.0[..3]) {
                *total += channel as u64;
            }
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    Some(sum.map(|total| total as f64 / n as f64))
}

/// Mean intensity over the pixels set in `mask`
pub fn masked_mean_luma(gray: &GrayImage, mask: &GrayImage) -> Option<f64> {
    let (sum, n) = gray
        .pixels()
        .zip(mask.pixels())
        .filter(|(_, m)| m[0] > 0)
        .fold((0_u64, 0_u64), |(sum, n), (p, _)| (sum + p[0] as u64, n + 1));
    if n == 0 {
        return None;
    }
    Some(sum as f64 / n as f64)
}
