use crate::Error;
use image::math::Rect;
use image::{GenericImageView, GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::integral_image::{integral_image, integral_squared_image, sum_image_pixels};
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use log::debug;
use std::path::Path;

/// Minimum correlation for a marker match.
pub const MATCH_THRESHOLD: f32 = 0.75;
/// Blue values below this are not part of the highlight.
pub const HIGHLIGHT_LEVEL: u8 = 200;
/// Width of the word area to the right of the marker.
pub const WORD_WIDTH: u32 = 205;
/// Extra rows below the marker height included in the word area.
pub const WORD_MARGIN: u32 = 5;

type IntegralImage = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Location and correlation score of a marker match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// The highlight marker shown next to the focus word in arcade mode.
pub struct Marker {
    template: GrayImage,
    /// Sum of the template values
    sum: f64,
    /// Sum of squared deviations from the template mean
    energy: f64,
}

/// Blue channel of `frame`, with everything below [HIGHLIGHT_LEVEL] set to zero.
pub fn highlight(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let b = frame.get_pixel(x, y)[2];
        Luma([if b < HIGHLIGHT_LEVEL { 0 } else { b }])
    })
}

impl Marker {
    /// Create a marker from a grayscale template.
    ///
    /// # Errors
    /// [Error::FlatTemplate] if all template pixels have the same value.
    pub fn new(template: GrayImage) -> Result<Marker, Error> {
        let n = (template.width() * template.height()) as f64;
        let sum = template.pixels().map(|p| p[0] as f64).sum::<f64>();
        let mean = sum / n;
        let energy: f64 = template
            .pixels()
            .map(|p| (p[0] as f64 - mean).powi(2))
            .sum();
        if energy <= 0.0 {
            return Err(Error::FlatTemplate);
        }
        Ok(Marker {
            template,
            sum,
            energy,
        })
    }

    /// Load the marker template from an image file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Marker, Error> {
        let path = path.as_ref();
        let template = image::open(path)
            .map_err(|source| Error::ImageError {
                path: path.display().to_string(),
                source,
            })?
            .into_luma8();
        Marker::new(template)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.template.dimensions()
    }

    /// Find every position where the marker correlates with `img` at or above
    /// `threshold`, in row major order.
    ///
    /// The score is the zero-mean normalized cross correlation, in `-1..=1`.
    /// Windows without any contrast score zero.
    pub fn locate(&self, img: &GrayImage, threshold: f32) -> Vec<Match> {
        let (w, h) = self.template.dimensions();
        let (iw, ih) = img.dimensions();
        if w > iw || h > ih {
            return Vec::new();
        }
        let correlation =
            match_template(img, &self.template, MatchTemplateMethod::CrossCorrelation);
        let integral: IntegralImage = integral_image::<_, u64>(img);
        let integral_squared: IntegralImage = integral_squared_image::<_, u64>(img);
        let n = (w * h) as f64;

        let mut matches = Vec::new();
        for y in 0..=(ih - h) {
            for x in 0..=(iw - w) {
                let (right, bottom) = (x + w - 1, y + h - 1);
                let sum = sum_image_pixels(&integral, x, y, right, bottom)[0] as f64;
                let sum_sq = sum_image_pixels(&integral_squared, x, y, right, bottom)[0] as f64;
                let window_energy = sum_sq - sum * sum / n;
                if window_energy < 1e-6 {
                    continue;
                }
                // correlation with the zero-mean template
                let cross = correlation.get_pixel(x, y)[0] as f64 - self.sum * sum / n;
                let score = (cross / (self.energy * window_energy).sqrt()) as f32;
                if score >= threshold {
                    matches.push(Match { x, y, score });
                }
            }
        }
        matches
    }

    /// The word area right of a match, clipped to an image of `size`.
    pub fn word_area(&self, m: &Match, size: (u32, u32)) -> Option<Rect> {
        let (w, h) = self.template.dimensions();
        let (iw, ih) = size;
        let x = m.x + w;
        if x >= iw || m.y >= ih {
            return None;
        }
        Some(Rect {
            x,
            y: m.y,
            width: WORD_WIDTH.min(iw - x),
            height: (h + WORD_MARGIN).min(ih - m.y),
        })
    }

    /// Crop the word areas next to all highlighted markers in `frame`.
    ///
    /// Overlapping matches are not merged; each one yields its own crop.
    pub fn regions(&self, frame: &RgbImage) -> Vec<GrayImage> {
        let img = highlight(frame);
        let matches = self.locate(&img, MATCH_THRESHOLD);
        debug!("{} marker matches", matches.len());
        matches
            .iter()
            .filter_map(|m| self.word_area(m, img.dimensions()))
            .map(|r| img.view(r.x, r.y, r.width, r.height).to_image())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    fn triangle(size: u32) -> GrayImage {
        let mut t = GrayImage::new(size, size);
        let s = size as i32 - 2;
        draw_polygon_mut(
            &mut t,
            &[Point::new(1, 1), Point::new(s, s / 2), Point::new(1, s)],
            Luma([255]),
        );
        t
    }

    /// Paint the marker onto `frame` in white at (x0, y0).
    fn paint(frame: &mut RgbImage, marker: &GrayImage, x0: u32, y0: u32) {
        for (x, y, p) in marker.enumerate_pixels() {
            if p[0] > 0 {
                frame.put_pixel(x0 + x, y0 + y, Rgb([255, 255, 255]));
            }
        }
    }

    fn screen() -> RgbImage {
        let mut frame = RgbImage::from_pixel(300, 120, Rgb([30, 60, 120]));
        paint(&mut frame, &triangle(12), 10, 20);
        paint(&mut frame, &triangle(12), 40, 80);
        frame
    }

    #[test]
    fn test_highlight() {
        let mut frame = RgbImage::from_pixel(2, 1, Rgb([0, 0, 199]));
        frame.put_pixel(1, 0, Rgb([0, 0, 200]));
        let img = highlight(&frame);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 200);
    }

    #[test]
    fn test_flat_template() {
        let flat = GrayImage::from_pixel(8, 8, Luma([200]));
        assert!(matches!(Marker::new(flat), Err(Error::FlatTemplate)));
    }

    #[test]
    fn test_locate_markers() {
        let marker = Marker::new(triangle(12)).unwrap();
        let img = highlight(&screen());
        let matches = marker.locate(&img, MATCH_THRESHOLD);
        for &(x, y) in &[(10, 20), (40, 80)] {
            let m = matches.iter().find(|m| m.x == x && m.y == y).unwrap();
            assert!(m.score > 0.99);
        }
        assert!(matches.iter().all(|m| m.score >= MATCH_THRESHOLD));
        // row major order
        assert!(matches.windows(2).all(|w| (w[0].y, w[0].x) < (w[1].y, w[1].x)));
    }

    #[test]
    fn test_score_ignores_brightness_and_contrast() {
        let template = triangle(12);
        let marker = Marker::new(template.clone()).unwrap();
        let mut img = GrayImage::from_pixel(40, 30, Luma([90]));
        let mut inverted = GrayImage::from_pixel(40, 30, Luma([90]));
        for (x, y, p) in template.enumerate_pixels() {
            img.put_pixel(x + 5, y + 7, Luma([40 + p[0] / 2]));
            inverted.put_pixel(x + 5, y + 7, Luma([255 - p[0]]));
        }
        let m = marker.locate(&img, 0.99);
        assert!(!m.is_empty());
        assert!(m.iter().all(|m| (m.x, m.y) == (5, 7)));
        assert!((m[0].score - 1.0).abs() < 1e-3);

        let all = marker.locate(&inverted, -1.0);
        let m = all.iter().find(|m| (m.x, m.y) == (5, 7)).unwrap();
        assert!((m.score + 1.0).abs() < 1e-3);
        assert!(all.iter().all(|m| m.score >= -1.001 && m.score <= 1.001));
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let marker = Marker::new(triangle(12)).unwrap();
        let img = highlight(&screen());
        let loose = marker.locate(&img, MATCH_THRESHOLD);
        let strict = marker.locate(&img, 0.95);
        assert!(!strict.is_empty());
        assert!(strict.len() <= loose.len());
        assert!(strict.iter().all(|m| loose.contains(m)));
    }

    #[test]
    fn test_word_area_is_clipped() {
        let marker = Marker::new(triangle(12)).unwrap();
        let m = Match {
            x: 10,
            y: 20,
            score: 1.0,
        };
        assert_eq!(
            marker.word_area(&m, (300, 120)),
            Some(Rect {
                x: 22,
                y: 20,
                width: 205,
                height: 17
            })
        );
        assert_eq!(
            marker.word_area(&m, (100, 30)),
            Some(Rect {
                x: 22,
                y: 20,
                width: 78,
                height: 10
            })
        );
        assert_eq!(marker.word_area(&m, (22, 30)), None);
    }

    #[test]
    fn test_regions() {
        let marker = Marker::new(triangle(12)).unwrap();
        let regions = marker.regions(&screen());
        assert!(regions.len() >= 2);
        assert!(regions.iter().all(|r| r.height() <= 17 && r.width() <= 205));
    }

    #[test]
    fn test_no_markers() {
        let marker = Marker::new(triangle(12)).unwrap();
        let frame = RgbImage::from_pixel(300, 120, Rgb([30, 60, 120]));
        assert!(marker.regions(&frame).is_empty());
    }
}
