//! Variantmill Core - Image variant generation engine
//!
//! This crate decodes a single source image and derives batches of variants
//! from it: progressive rotations, named color corrections, and randomized
//! distortions. Each transform family has its own options shape and
//! generator; the [`store::VariantStore`] holds the one current source and
//! the latest batch per family, and [`generate::generate_family`] ties
//! validation, decoding, generation, encoding, and batch replacement
//! together.
//!
//! The web layer around this engine (upload forms, previews, saving to
//! disk) is an external collaborator; it hands in source bytes and options
//! and gets back named JPEG variants.

pub mod codec;
pub mod color;
pub mod distort;
pub mod generate;
pub mod rotate;
pub mod store;

pub use codec::{DecodeError, EncodeError, Raster};
pub use color::AdjustmentKind;
pub use distort::{DistortError, DistortionCategory};
pub use generate::{generate_family, FamilyOptions, GenerateError};
pub use store::{SourceImage, TransformFamily, Variant, VariantStore};

use thiserror::Error;

/// Upper bound on the rotation variant count, to keep work and storage
/// bounded per batch.
pub const MAX_ROTATE_COUNT: u32 = 100;

/// Configuration errors, rejected before any raster work.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero angle step would produce identical copies.
    #[error("Rotation angle step must not be zero")]
    ZeroAngleStep,

    /// A batch must contain at least one variant.
    #[error("Rotation count must be positive")]
    ZeroCount,

    /// Refuse to generate oversized batches.
    #[error("Too many images requested: {count} exceeds the maximum of {max}")]
    CountTooLarge { count: u32, max: u32 },
}

/// Options for the rotation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RotateOptions {
    /// Angle step in degrees; variant i is rotated by `i * angle_step`.
    pub angle_step: i32,
    /// Number of variants to generate (1 to [`MAX_ROTATE_COUNT`]).
    pub count: u32,
}

impl RotateOptions {
    /// Check the caller contract of the rotation generator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.angle_step == 0 {
            return Err(ConfigError::ZeroAngleStep);
        }
        if self.count == 0 {
            return Err(ConfigError::ZeroCount);
        }
        if self.count > MAX_ROTATE_COUNT {
            return Err(ConfigError::CountTooLarge {
                count: self.count,
                max: MAX_ROTATE_COUNT,
            });
        }
        Ok(())
    }
}

/// Options for the color-correction family: adjustment tokens in request
/// order. Unrecognized tokens are skipped, not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorCorrectionOptions {
    pub adjustments: Vec<String>,
}

/// Options for the distortion family: one category token, plus an optional
/// wall-clock budget for the elastic-warp step (the most expensive single
/// operation in the engine). Unrecognized categories produce an empty
/// batch, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DistortionOptions {
    pub category: String,
    pub elastic_budget: Option<std::time::Duration>,
}
