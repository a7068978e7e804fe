//! Progressive rotation variants.
//!
//! Produces a sequence of rotations of the source raster about its center.
//! Variant `i` (1-indexed) is rotated by `i * angle_step` degrees, so the
//! sequence accumulates rather than repeating one fixed angle.
//!
//! # Algorithm
//!
//! Inverse mapping: for each pixel of the output we compute the source
//! coordinate that lands on it and sample with bilinear interpolation.
//! For a rotation by angle θ about center (cx, cy):
//! ```text
//! src_x = (dst_x - cx) * cos(θ) - (dst_y - cy) * sin(θ) + cx
//! src_y = (dst_x - cx) * sin(θ) + (dst_y - cy) * cos(θ) + cy
//! ```
//!
//! The output keeps the source's exact dimensions; content rotated outside
//! the frame is lost and uncovered pixels are black. Positive angles rotate
//! counter-clockwise.

use crate::codec::Raster;

/// Generate `count` progressively rotated variants of the source.
///
/// The rotation center is `(width / 2, height / 2)` with integer division.
/// Every output has the same dimensions as the source.
///
/// Option validation (`angle_step != 0`, `0 < count <= 100`) is caller
/// contract, enforced by [`RotateOptions::validate`](crate::RotateOptions)
/// before this function runs.
pub fn generate(source: &Raster, angle_step: i32, count: u32) -> Vec<Raster> {
    let mut variants = Vec::with_capacity(count as usize);
    for i in 1..=count {
        let degrees = (i as i64 * angle_step as i64) as f64;
        variants.push(rotate_about_center(source, degrees));
    }
    variants
}

/// Rotate the source by `degrees` about its integer-division center.
fn rotate_about_center(source: &Raster, degrees: f64) -> Raster {
    let cx = (source.width / 2) as f64;
    let cy = (source.height / 2) as f64;

    let angle_rad = degrees.to_radians();
    let cos = angle_rad.cos();
    let sin = angle_rad.sin();

    let (w, h) = (source.width, source.height);
    let mut output = vec![0u8; source.byte_size()];

    for dst_y in 0..h {
        for dst_x in 0..w {
            let dx = dst_x as f64 - cx;
            let dy = dst_y as f64 - cy;

            let src_x = dx * cos - dy * sin + cx;
            let src_y = dx * sin + dy * cos + cy;

            let pixel = sample_bilinear(source, src_x, src_y);
            let dst_idx = ((dst_y * w + dst_x) * 3) as usize;
            output[dst_idx..dst_idx + 3].copy_from_slice(&pixel);
        }
    }

    Raster::new(w, h, output)
}

/// Get a pixel as [f64; 3] from a raster at the given coordinates.
#[inline]
fn get_pixel_f64(raster: &Raster, px: u32, py: u32) -> [f64; 3] {
    let p = raster.pixel(px, py);
    [p[0] as f64, p[1] as f64, p[2] as f64]
}

/// Sample a pixel using bilinear interpolation.
///
/// Out-of-frame coordinates sample black, matching the constant border of
/// the rotation resample.
pub(crate) fn sample_bilinear(raster: &Raster, x: f64, y: f64) -> [u8; 3] {
    let max_x = (raster.width - 1) as f64;
    let max_y = (raster.height - 1) as f64;

    if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return [0, 0, 0];
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(raster.width - 1);
    let y1 = (y0 + 1).min(raster.height - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_pixel_f64(raster, x0, y0);
    let p10 = get_pixel_f64(raster, x1, y0);
    let p01 = get_pixel_f64(raster, x0, y1);
    let p11 = get_pixel_f64(raster, x1, y1);

    let mut result = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] * (1.0 - fx) * (1.0 - fy)
            + p10[c] * fx * (1.0 - fy)
            + p01[c] * (1.0 - fx) * fy
            + p11[c] * fx * fy;
        result[c] = v.clamp(0.0, 255.0).round() as u8;
    }
    result
}
