//! JPEG encoding for variant storage.
//!
//! All derived variants are stored as JPEG regardless of the source's
//! original format. Quality is an implementation-fixed constant.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use thiserror::Error;

use super::Raster;

/// Fixed JPEG quality for every encoded variant.
pub const JPEG_QUALITY: u8 = 95;

/// Media type of every encoded variant.
pub const VARIANT_MEDIA_TYPE: &str = "image/jpeg";

/// Errors that can occur during JPEG encoding.
///
/// These signal internal invariant violations; a raster produced by
/// [`decode`](super::decode) or by a generator never triggers them.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Encode a BGR raster to JPEG bytes at the fixed quality.
///
/// The raster's BGR channels are swapped back to RGB for the encoder;
/// no channel is ever dropped.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, EncodeError> {
    if raster.width == 0 || raster.height == 0 {
        return Err(EncodeError::InvalidDimensions {
            width: raster.width,
            height: raster.height,
        });
    }

    let expected_len = (raster.width as usize) * (raster.height as usize) * 3;
    if raster.pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: raster.pixels.len(),
        });
    }

    let mut rgb = raster.pixels.clone();
    for chunk in rgb.chunks_exact_mut(3) {
        chunk.swap(0, 2);
    }

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .write_image(&rgb, raster.width, raster.height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}


// ============================================================================
// Property-Based Tests
// ============================================================================
