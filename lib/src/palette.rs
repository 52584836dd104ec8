use image::{GenericImageView, RgbImage};
use log::debug;
use rand::Rng;

/// Number of k-means clusters computed per frame.
pub const CLUSTERS: usize = 8;
/// Clusters covering more than this fraction of the play area are background.
pub const MAX_BLOCK_FRACTION: f32 = 0.2;
/// Channels within this distance of each other make a gray color.
pub const GRAY_TOLERANCE: u8 = 10;
/// The random block pick only looks at this many leading candidates.
pub const PICK_WINDOW: usize = 4;

const ITERATIONS: usize = 10;

/// A representative color and the fraction of the analyzed area it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub color: [u8; 3],
    pub fraction: f32,
}

impl ColorSample {
    /// True when all three channels are pairwise within [GRAY_TOLERANCE].
    pub fn is_gray(&self) -> bool {
        let [r, g, b] = self.color;
        r.abs_diff(g) <= GRAY_TOLERANCE
            && g.abs_diff(b) <= GRAY_TOLERANCE
            && r.abs_diff(b) <= GRAY_TOLERANCE
    }

    pub fn is_background(&self) -> bool {
        self.fraction > MAX_BLOCK_FRACTION || self.is_gray()
    }
}

/// Cluster the bottom half of `frame` into at most `k` dominant colors.
///
/// Samples come back in cluster order. Clusters that lose all their pixels
/// during refinement are dropped.
pub fn dominant_colors(frame: &RgbImage, k: usize) -> Vec<ColorSample> {
    let (width, height) = frame.dimensions();
    let top = height / 2;
    let pixels: Vec<[u8; 3]> = frame
        .view(0, top, width, height - top)
        .pixels()
        .map(|(_, _, p)| [p[0], p[1], p[2]])
        .collect();
    kmeans(&pixels, k, ITERATIONS)
}

/// Colors of the word blocks: the dominant colors minus gray and large areas.
pub fn block_colors(frame: &RgbImage) -> Vec<ColorSample> {
    let samples = dominant_colors(frame, CLUSTERS);
    for s in samples.iter() {
        debug!("cluster {:?} covers {:.3}", s.color, s.fraction);
    }
    samples.into_iter().filter(|s| !s.is_background()).collect()
}

/// Pick one of the first [PICK_WINDOW] candidates at random.
///
/// Returns `None` when there is nothing to pick from.
pub fn pick_block_color<R: Rng + ?Sized>(
    candidates: &[ColorSample],
    rng: &mut R,
) -> Option<ColorSample> {
    let n = candidates.len().min(PICK_WINDOW);
    if n == 0 {
        return None;
    }
    Some(candidates[rng.gen_range(0..n)])
}

fn distance(p: &[u8; 3], c: &[f32; 3]) -> f32 {
    let dr = p[0] as f32 - c[0];
    let dg = p[1] as f32 - c[1];
    let db = p[2] as f32 - c[2];
    dr * dr + dg * dg + db * db
}

fn nearest(p: &[u8; 3], centroids: &[[f32; 3]]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, distance(p, c)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn kmeans(pixels: &[[u8; 3]], k: usize, iterations: usize) -> Vec<ColorSample> {
    if pixels.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k.min(pixels.len());

    // farthest-point seeding on a sparse sample of the pixels
    let mut centroids: Vec<[f32; 3]> = Vec::with_capacity(k);
    let first = pixels[0];
    centroids.push([first[0] as f32, first[1] as f32, first[2] as f32]);
    let step = pixels.len() / 1000 + 1;
    for _ in 1..k {
        let mut max_dist = 0.0f32;
        let mut best = first;
        for p in pixels.iter().step_by(step) {
            let d = centroids
                .iter()
                .map(|c| distance(p, c))
                .fold(f32::INFINITY, f32::min);
            if d > max_dist {
                max_dist = d;
                best = *p;
            }
        }
        centroids.push([best[0] as f32, best[1] as f32, best[2] as f32]);
    }

    let mut counts = vec![0usize; k];
    for _ in 0..iterations {
        let mut sums = vec![[0f64; 3]; k];
        counts.iter_mut().for_each(|c| *c = 0);
        for p in pixels {
            let i = nearest(p, &centroids);
            sums[i][0] += p[0] as f64;
            sums[i][1] += p[1] as f64;
            sums[i][2] += p[2] as f64;
            counts[i] += 1;
        }
        for (i, centroid) in centroids.iter_mut().enumerate() {
            if counts[i] > 0 {
                let n = counts[i] as f64;
                for ch in 0..3 {
                    centroid[ch] = (sums[i][ch] / n) as f32;
                }
            }
        }
    }

    // counts of the last pass belong to the centroids before the final update,
    // so assign once more against the settled centroids
    counts.iter_mut().for_each(|c| *c = 0);
    for p in pixels {
        counts[nearest(p, &centroids)] += 1;
    }

    let total = pixels.len() as f32;
    centroids
        .iter()
        .zip(counts.iter())
        .filter(|(_, &n)| n > 0)
        .map(|(c, &n)| ColorSample {
            color: [
                c[0].round() as u8,
                c[1].round() as u8,
                c[2].round() as u8,
            ],
            fraction: n as f32 / total,
        })
        .collect()
}
