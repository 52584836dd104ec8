use image::math::Rect;
use image::{imageops, GenericImageView, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::filter::bilateral_filter;
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point;
use log::debug;

/// Hue tolerance around the block color, on the 0..180 hue scale.
pub const HUE_TOLERANCE: u8 = 10;
/// Fixed intensity cutoff used to find the blocks in the tracked image.
pub const BLOCK_THRESHOLD: u8 = 75;
/// Erosion and dilation radius.
const MORPH_RADIUS: u8 = 2;
/// Bilateral filter window and sigmas.
const BLUR_WINDOW: u32 = 9;
const BLUR_SIGMA: f32 = 50.0;

/// Hue of an RGB color on the 0..180 scale, `None` for achromatic colors.
pub fn hue(color: [u8; 3]) -> Option<u8> {
    let [r, g, b] = color.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;
    if diff == 0.0 {
        return None;
    }
    let mut h = if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    Some(((h / 2.0).round() as u32 % 180) as u8)
}

fn hue_distance(a: u8, b: u8) -> u8 {
    let d = a.abs_diff(b);
    d.min(180 - d)
}

/// Binary mask of the pixels whose hue is within [HUE_TOLERANCE] of `color`.
pub fn color_mask(frame: &RgbImage, color: [u8; 3]) -> GrayImage {
    let target = hue(color);
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y).0;
        match (target, hue(p)) {
            (Some(t), Some(h)) if hue_distance(t, h) <= HUE_TOLERANCE => Luma([255]),
            _ => Luma([0]),
        }
    })
}

/// Keep the pixels of `frame` selected by `mask`, black elsewhere.
pub fn apply_mask(frame: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *frame.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Pixels above `level` become white, everything else black.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Area enclosed by a closed contour (shoelace formula).
pub fn contour_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    twice.abs() / 2.0
}

/// Index of the largest area. A later area must be strictly larger to win,
/// so the first contour wins all ties, including when every area is zero.
// The first-wins rule comes from seeding the running max with contour 0;
// revisit if merged blocks ever produce equal areas.
pub fn max_area_index(areas: &[f64]) -> Option<usize> {
    let mut best = 0;
    for (i, &area) in areas.iter().enumerate() {
        if area > areas[best] {
            best = i;
        }
    }
    (!areas.is_empty()).then_some(best)
}

fn bounding_rect(points: &[Point<u32>]) -> Rect {
    let x0 = points.iter().map(|p| p.x).min().unwrap_or(0);
    let y0 = points.iter().map(|p| p.y).min().unwrap_or(0);
    let x1 = points.iter().map(|p| p.x).max().unwrap_or(0);
    let y1 = points.iter().map(|p| p.y).max().unwrap_or(0);
    Rect {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    }
}

fn fill_contour(width: u32, height: u32, points: &[Point<u32>]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let poly: Vec<Point<i32>> = points
        .iter()
        .map(|p| Point::new(p.x as i32, p.y as i32))
        .collect();
    // draw_polygon_mut rejects closed or empty point lists
    if poly.len() > 1 && poly.first() != poly.last() {
        draw_polygon_mut(&mut mask, &poly, Luma([255]));
    }
    for p in points {
        mask.put_pixel(p.x, p.y, Luma([255]));
    }
    mask
}

/// Outer contours of the foreground in `bw`, including shapes that touch
/// the image border.
pub fn outer_contours(bw: &GrayImage) -> Vec<Vec<Point<u32>>> {
    // find_contours misses foreground on the border, so trace a padded copy
    let mut padded = GrayImage::new(bw.width() + 2, bw.height() + 2);
    for (x, y, p) in bw.enumerate_pixels() {
        padded.put_pixel(x + 1, y + 1, *p);
    }
    find_contours::<u32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect()
        })
        .collect()
}

/// Clean binary image of the blocks with the hue of `color`.
pub fn block_mask(tracked: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(tracked);
    let smooth = bilateral_filter(&gray, BLUR_WINDOW, BLUR_SIGMA, BLUR_SIGMA);
    let bw = binarize(&smooth, BLOCK_THRESHOLD);
    let bw = erode(&bw, Norm::LInf, MORPH_RADIUS);
    dilate(&bw, Norm::LInf, MORPH_RADIUS)
}

/// Extract the largest block with the hue of `color` as a black and white
/// image ready for text recognition.
///
/// The returned image is cropped to the bounding box of the block. Everything
/// outside the block outline is black.
/// Returns `None` if there is no block of that color.
pub fn extract_block(frame: &RgbImage, color: [u8; 3]) -> Option<GrayImage> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let tracked = apply_mask(frame, &color_mask(frame, color));
    let contours = outer_contours(&block_mask(&tracked));
    let areas: Vec<f64> = contours.iter().map(|c| contour_area(c)).collect();
    let index = max_area_index(&areas)?;
    let points = &contours[index];
    let rect = bounding_rect(points);
    debug!(
        "{} contours for {:?}, largest {} with area {} at {:?}",
        contours.len(),
        color,
        index,
        areas[index],
        rect
    );

    let mask = fill_contour(width, height, points);
    let block = imageops::grayscale(&apply_mask(&tracked, &mask));
    let bw = binarize(&block, otsu_level(&block));
    let text = GrayImage::from_fn(width, height, |x, y| {
        let inverted = 255 - bw.get_pixel(x, y)[0];
        let outside = 255 - mask.get_pixel(x, y)[0];
        Luma([inverted.saturating_sub(outside)])
    });
    Some(
        text.view(rect.x, rect.y, rect.width, rect.height)
            .to_image(),
    )
}
