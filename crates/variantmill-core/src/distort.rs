//! Distortion variants: geometric warps, blurs, and noise.
//!
//! Each recognized category produces a fixed set of three variants with
//! randomized parameters drawn fresh from the caller's RNG within bounded
//! ranges. An unknown category token yields an empty batch rather than an
//! error; collaborators rely on passing tokens through unvalidated.
//!
//! All neighborhood operators use reflect-101 border handling. The elastic
//! warp is the most expensive operation in the engine (it scales with image
//! area), so it carries an optional wall-clock budget checked per output
//! row.

use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;

use crate::codec::Raster;
use crate::rotate::sample_bilinear;

/// Fraction of pixels set to pure white (and, independently, pure black)
/// by salt-and-pepper noise.
const SALT_PEPPER_FRACTION: f64 = 0.02;

/// Maximum inward corner displacement of the perspective warp, as a
/// fraction of width/height.
const PERSPECTIVE_MAX_SHIFT: f64 = 0.2;

/// Gaussian smoothing sigma for the elastic displacement fields.
const ELASTIC_SIGMA: f32 = 8.0;

/// Maximum per-pixel displacement of the elastic warp, in pixels.
const ELASTIC_ALPHA: f32 = 15.0;

/// The two additive Gaussian noise settings, as (mean, sigma).
const NOISE_SETTINGS: [(f64, f64); 2] = [(0.0, 15.0), (10.0, 40.0)];

/// Errors from distortion generation.
#[derive(Debug, Error)]
pub enum DistortError {
    /// The elastic warp ran past its configured time budget.
    #[error("Elastic warp exceeded its time budget of {0:?}")]
    ElasticWarpTimeout(Duration),
}

/// Distortion category selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistortionCategory {
    /// Mirror flip, perspective warp, elastic warp.
    Distortion,
    /// Gaussian, box, and median blur.
    Blur,
    /// Salt-and-pepper plus two additive Gaussian noise settings.
    Noise,
}

impl DistortionCategory {
    /// Parse a category token. Unknown tokens yield `None`, which the
    /// generator treats as "produce nothing".
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "distortion" => Some(Self::Distortion),
            "blur" => Some(Self::Blur),
            "noise" => Some(Self::Noise),
            _ => None,
        }
    }

    /// Token used in variant file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Distortion => "distortion",
            Self::Blur => "blur",
            Self::Noise => "noise",
        }
    }
}

/// Generate the fixed variant set for a category token.
///
/// Recognized categories return exactly 3 variants; unknown tokens return
/// an empty vector. `elastic_budget` bounds only the elastic-warp step of
/// the `distortion` category.
pub fn generate<R: Rng>(
    source: &Raster,
    category_token: &str,
    elastic_budget: Option<Duration>,
    rng: &mut R,
) -> Result<Vec<Raster>, DistortError> {
    let Some(category) = DistortionCategory::parse(category_token) else {
        return Ok(Vec::new());
    };

    let variants = match category {
        DistortionCategory::Distortion => vec![
            flip_horizontal(source),
            perspective_warp(source, rng),
            elastic_warp(source, elastic_budget, rng)?,
        ],
        DistortionCategory::Blur => vec![
            gaussian_blur(source, 5),
            box_blur(source, 9),
            median_blur(source, 5),
        ],
        DistortionCategory::Noise => vec![
            salt_and_pepper(source, SALT_PEPPER_FRACTION, rng),
            additive_gaussian_noise(source, NOISE_SETTINGS[0].0, NOISE_SETTINGS[0].1, rng),
            additive_gaussian_noise(source, NOISE_SETTINGS[1].0, NOISE_SETTINGS[1].1, rng),
        ],
    };
    Ok(variants)
}

/// Mirror the raster left-to-right.
pub fn flip_horizontal(source: &Raster) -> Raster {
    let mut out = source.clone();
    for y in 0..source.height {
        for x in 0..source.width {
            out.set_pixel(x, y, source.pixel(source.width - 1 - x, y));
        }
    }
    out
}

/// Warp the raster through a random perspective transform.
///
/// Each source corner is mapped to a target corner displaced independently
/// inward by up to 20% of width/height; the homography is solved from the
/// four correspondences and the output is inverse-resampled. Regions
/// outside the warped quad come out black.
pub fn perspective_warp<R: Rng>(source: &Raster, rng: &mut R) -> Raster {
    let w = (source.width - 1) as f64;
    let h = (source.height - 1) as f64;
    let max_dx = PERSPECTIVE_MAX_SHIFT * w;
    let max_dy = PERSPECTIVE_MAX_SHIFT * h;

    let src_corners = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
    let dst_corners = [
        [rng.random_range(0.0..=max_dx), rng.random_range(0.0..=max_dy)],
        [w - rng.random_range(0.0..=max_dx), rng.random_range(0.0..=max_dy)],
        [w - rng.random_range(0.0..=max_dx), h - rng.random_range(0.0..=max_dy)],
        [rng.random_range(0.0..=max_dx), h - rng.random_range(0.0..=max_dy)],
    ];

    // Solve the output-to-source homography directly so resampling is a
    // single inverse map per pixel.
    let hm = solve_homography(&dst_corners, &src_corners);

    let mut out = Raster::filled(source.width, source.height, [0, 0, 0]);
    for y in 0..source.height {
        for x in 0..source.width {
            let (sx, sy) = apply_homography(&hm, x as f64, y as f64);
            out.set_pixel(x, y, sample_bilinear(source, sx, sy));
        }
    }
    out
}

/// Warp the raster through smoothed random displacement fields.
///
/// Independent uniform noise fields for x and y are Gaussian-smoothed and
/// scaled to a fixed maximum displacement, then the source is remapped
/// through them with reflective borders. Checks the optional time budget
/// once per output row.
pub fn elastic_warp<R: Rng>(
    source: &Raster,
    budget: Option<Duration>,
    rng: &mut R,
) -> Result<Raster, DistortError> {
    let start = Instant::now();
    let (w, h) = (source.width as usize, source.height as usize);

    let mut field_x: Vec<f32> = (0..w * h).map(|_| rng.random_range(-1.0..=1.0)).collect();
    let mut field_y: Vec<f32> = (0..w * h).map(|_| rng.random_range(-1.0..=1.0)).collect();
    smooth_field(&mut field_x, w, h, ELASTIC_SIGMA);
    smooth_field(&mut field_y, w, h, ELASTIC_SIGMA);
    scale_field(&mut field_x, ELASTIC_ALPHA);
    scale_field(&mut field_y, ELASTIC_ALPHA);

    let mut out = Raster::filled(source.width, source.height, [0, 0, 0]);
    for y in 0..h {
        if let Some(limit) = budget {
            if start.elapsed() > limit {
                return Err(DistortError::ElasticWarpTimeout(limit));
            }
        }
        for x in 0..w {
            let idx = y * w + x;
            let sx = x as f64 + field_x[idx] as f64;
            let sy = y as f64 + field_y[idx] as f64;
            // Reflect the displaced coordinate back into the frame, then
            // sample; after reflection the coordinate is always in bounds.
            let rx = reflect_f(sx, source.width);
            let ry = reflect_f(sy, source.height);
            out.set_pixel(x as u32, y as u32, sample_bilinear(source, rx, ry));
        }
    }
    Ok(out)
}

/// Gaussian blur with a fixed small kernel.
pub fn gaussian_blur(source: &Raster, ksize: u32) -> Raster {
    // Sigma derived from kernel size the way OpenCV does for sigma=0.
    let sigma = 0.3 * (((ksize - 1) as f32) * 0.5 - 1.0) + 0.8;
    let radius = (ksize / 2) as i64;
    let kernel = gaussian_kernel(sigma, radius);
    separable_convolve(source, &kernel)
}

/// Box (average) blur with a fixed larger kernel.
pub fn box_blur(source: &Raster, ksize: u32) -> Raster {
    let radius = (ksize / 2) as i64;
    let weight = 1.0 / (2 * radius + 1) as f32;
    let kernel = vec![weight; (2 * radius + 1) as usize];
    separable_convolve(source, &kernel)
}

/// Median blur with a fixed kernel.
pub fn median_blur(source: &Raster, ksize: u32) -> Raster {
    let radius = (ksize / 2) as i64;
    let window = ((2 * radius + 1) * (2 * radius + 1)) as usize;
    let mut out = source.clone();
    let mut values = [vec![0u8; window], vec![0u8; window], vec![0u8; window]];

    for y in 0..source.height {
        for x in 0..source.width {
            let mut n = 0;
            for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let px = reflect_i(x as i64 + kx, source.width);
                    let py = reflect_i(y as i64 + ky, source.height);
                    let p = source.pixel(px, py);
                    for c in 0..3 {
                        values[c][n] = p[c];
                    }
                    n += 1;
                }
            }
            let mut pixel = [0u8; 3];
            for c in 0..3 {
                values[c].sort_unstable();
                pixel[c] = values[c][window / 2];
            }
            out.set_pixel(x, y, pixel);
        }
    }
    out
}

/// Set ~`fraction` of pixels to pure white and, independently, ~`fraction`
/// to pure black. The two coordinate sets are sampled separately, so
/// collisions are possible and accepted.
pub fn salt_and_pepper<R: Rng>(source: &Raster, fraction: f64, rng: &mut R) -> Raster {
    let mut out = source.clone();
    let count = (source.pixel_count() as f64 * fraction).round() as u32;

    for _ in 0..count {
        let x = rng.random_range(0..source.width);
        let y = rng.random_range(0..source.height);
        out.set_pixel(x, y, [255, 255, 255]);
    }
    for _ in 0..count {
        let x = rng.random_range(0..source.width);
        let y = rng.random_range(0..source.height);
        out.set_pixel(x, y, [0, 0, 0]);
    }
    out
}

/// Add Gaussian noise with the given mean and standard deviation to every
/// channel, clamped to [0, 255].
pub fn additive_gaussian_noise<R: Rng>(
    source: &Raster,
    mean: f64,
    sigma: f64,
    rng: &mut R,
) -> Raster {
    let mut out = source.clone();
    for v in &mut out.pixels {
        let noise = mean + sigma * standard_normal(rng);
        *v = (*v as f64 + noise).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// One standard-normal deviate via the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - u keeps the logarithm's argument strictly positive.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Solve the homography mapping `from[i] -> to[i]` for four point pairs.
///
/// Returns the row-major 3x3 matrix (last entry fixed at 1). Standard
/// 8-unknown linear system, Gaussian elimination with partial pivoting.
fn solve_homography(from: &[[f64; 2]; 4], to: &[[f64; 2]; 4]) -> [f64; 9] {
    let mut m = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let [x, y] = from[i];
        let [u, v] = to[i];
        m[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
        m[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
    }

    for col in 0..8 {
        let pivot = (col..8)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot);
        let lead = m[col][col];
        if lead.abs() < 1e-12 {
            continue;
        }
        for k in col..9 {
            m[col][k] /= lead;
        }
        for row in 0..8 {
            if row != col {
                let factor = m[row][col];
                for k in col..9 {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }
    }

    [
        m[0][8], m[1][8], m[2][8], m[3][8], m[4][8], m[5][8], m[6][8], m[7][8], 1.0,
    ]
}

/// Map a point through a 3x3 homography.
fn apply_homography(hm: &[f64; 9], x: f64, y: f64) -> (f64, f64) {
    let denom = hm[6] * x + hm[7] * y + hm[8];
    if denom.abs() < 1e-12 {
        return (-1.0, -1.0); // samples black
    }
    (
        (hm[0] * x + hm[1] * y + hm[2]) / denom,
        (hm[3] * x + hm[4] * y + hm[5]) / denom,
    )
}

/// Normalized 1-D Gaussian kernel with the given sigma and radius.
fn gaussian_kernel(sigma: f32, radius: i64) -> Vec<f32> {
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i as f32).powi(2) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable horizontal-then-vertical convolution with reflect-101 borders.
fn separable_convolve(source: &Raster, kernel: &[f32]) -> Raster {
    let radius = (kernel.len() / 2) as i64;
    let (w, h) = (source.width, source.height);

    // Horizontal pass into a float buffer to avoid double quantization.
    let mut tmp = vec![0.0f32; source.byte_size()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let px = reflect_i(x as i64 + k as i64 - radius, w);
                let p = source.pixel(px, y);
                for c in 0..3 {
                    acc[c] += *weight * p[c] as f32;
                }
            }
            let idx = source.index(x, y);
            tmp[idx..idx + 3].copy_from_slice(&acc);
        }
    }

    let mut out = source.clone();
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let py = reflect_i(y as i64 + k as i64 - radius, h);
                let idx = ((py * w + x) * 3) as usize;
                for c in 0..3 {
                    acc[c] += *weight * tmp[idx + c];
                }
            }
            let pixel = [
                acc[0].round().clamp(0.0, 255.0) as u8,
                acc[1].round().clamp(0.0, 255.0) as u8,
                acc[2].round().clamp(0.0, 255.0) as u8,
            ];
            out.set_pixel(x, y, pixel);
        }
    }
    out
}

/// Smooth a scalar field in place with a separable Gaussian.
fn smooth_field(field: &mut [f32], w: usize, h: usize, sigma: f32) {
    let radius = (2.0 * sigma).ceil() as i64;
    let kernel = gaussian_kernel(sigma, radius);

    let mut tmp = vec![0.0f32; field.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let px = reflect_i(x as i64 + k as i64 - radius, w as u32) as usize;
                acc += *weight * field[y * w + px];
            }
            tmp[y * w + x] = acc;
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let py = reflect_i(y as i64 + k as i64 - radius, h as u32) as usize;
                acc += *weight * tmp[py * w + x];
            }
            field[y * w + x] = acc;
        }
    }
}

/// Scale a field so its largest magnitude equals `alpha`.
fn scale_field(field: &mut [f32], alpha: f32) {
    let max = field.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    if max > f32::EPSILON {
        let factor = alpha / max;
        for v in field.iter_mut() {
            *v *= factor;
        }
    }
}

/// Reflect-101 an integer coordinate into `[0, n)`.
#[inline]
fn reflect_i(i: i64, n: u32) -> u32 {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m < n {
        m as u32
    } else {
        (period - m) as u32
    }
}

/// Reflect-101 a fractional coordinate into `[0, n - 1]`.
#[inline]
fn reflect_f(x: f64, n: u32) -> f64 {
    let max = (n - 1) as f64;
    if n == 1 || max == 0.0 {
        return 0.0;
    }
    let period = 2.0 * max;
    let mut m = x.rem_euclid(period);
    if m > max {
        m = period - m;
    }
    m
}
