//! Still-image decoding with format sniffing.

use std::io::Cursor;

use image::ImageReader;

use super::{DecodeError, Raster};

/// Decode a compressed still image (JPEG, PNG, BMP, ...) into a BGR raster.
///
/// The format is sniffed from the byte content, not from any declared media
/// type, so a mislabeled upload still decodes. The result uses the engine's
/// fixed BGR channel order.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be recognized,
/// `DecodeError::CorruptedData` if decoding fails part-way, and
/// `DecodeError::EmptyImage` if the decoded image has a zero dimension.
pub fn decode(bytes: &[u8]) -> Result<Raster, DecodeError> {
    let cursor = Cursor::new(bytes);
    let reader = ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedData(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedData(e.to_string()))?;

    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }

    // The image crate yields RGB; swap into the engine's BGR convention.
    let mut pixels = rgb.into_raw();
    for chunk in pixels.chunks_exact_mut(3) {
        chunk.swap(0, 2);
    }

    Ok(Raster::new(width, height, pixels))
}
