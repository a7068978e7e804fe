//! Image codec boundary of the engine.
//!
//! This module provides functionality for:
//! - Decoding compressed still images (JPEG, PNG, BMP) into BGR rasters
//! - Re-encoding rasters to fixed-quality JPEG for storage
//!
//! # Channel Order
//!
//! Decoded rasters use interleaved blue-green-red channels, and every
//! transform stage relies on that order unconditionally. The RGB/BGR swap
//! happens only here, on both sides of the codec.
//!
//! # Examples
//!
//! ```ignore
//! use variantmill_core::codec::{decode, encode};
//!
//! let bytes = std::fs::read("photo.png").unwrap();
//! let raster = decode(&bytes).unwrap();
//! let jpeg = encode(&raster).unwrap();
//! ```

mod decode;
mod encode;
mod types;

pub use decode::decode;
pub use encode::{encode, EncodeError, JPEG_QUALITY, VARIANT_MEDIA_TYPE};
pub use types::{DecodeError, Raster};
