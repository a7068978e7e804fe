//! Family-level generation operations.
//!
//! One entry point, [`generate_family`], ties the engine together: validate
//! options, decode the current source once, run the family's generator,
//! encode every variant to JPEG, and atomically replace the family's batch
//! in the store. All generator-level errors are recovered here and turned
//! into a [`GenerateError`]; nothing panics the host.

use rand::Rng;
use thiserror::Error;

use crate::codec::{self, DecodeError, EncodeError, Raster, VARIANT_MEDIA_TYPE};
use crate::distort::DistortError;
use crate::store::{TransformFamily, Variant, VariantStore};
use crate::{color, distort, rotate};
use crate::{ColorCorrectionOptions, ConfigError, DistortionOptions, RotateOptions};

/// Options for one generation call, tagged by transform family.
///
/// Different families carry different option shapes; matching on this enum
/// is the engine's whole dispatch mechanism.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum FamilyOptions {
    Rotate(RotateOptions),
    ColorCorrection(ColorCorrectionOptions),
    Distortion(DistortionOptions),
}

impl FamilyOptions {
    /// The family this options payload belongs to.
    pub fn family(&self) -> TransformFamily {
        match self {
            Self::Rotate(_) => TransformFamily::Rotate,
            Self::ColorCorrection(_) => TransformFamily::ColorCorrection,
            Self::Distortion(_) => TransformFamily::Distortion,
        }
    }

    /// Validate before any raster work happens.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Rotate(opts) => opts.validate(),
            // Unknown adjustment or category tokens are documented leniency,
            // not configuration errors.
            Self::ColorCorrection(_) | Self::Distortion(_) => Ok(()),
        }
    }
}

/// Errors surfaced by a family generation call.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Malformed options, rejected before any raster work.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No source image has been uploaded. Callers typically render this as
    /// an empty state rather than a failure.
    #[error("No source image has been uploaded")]
    NoSourceImage,

    /// The source image was replaced while the batch was being generated.
    /// The stale batch was discarded; nothing was stored.
    #[error("Source image was replaced during generation; batch discarded")]
    SourceReplaced,

    /// The stored source bytes failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A variant failed to encode (internal invariant violation).
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A distortion step failed (elastic-warp time budget).
    #[error(transparent)]
    Distort(#[from] DistortError),
}

/// Generate a fresh batch of variants for one family and store it.
///
/// The previous batch for the family is fully replaced; on any error the
/// store is left untouched. If the source image is replaced concurrently
/// while the batch is being generated, the stale batch is discarded and
/// [`GenerateError::SourceReplaced`] is returned. Returns the number of
/// variants stored.
pub fn generate_family<R: Rng>(
    store: &VariantStore,
    options: &FamilyOptions,
    rng: &mut R,
) -> Result<usize, GenerateError> {
    options.validate()?;

    let source = store.source().ok_or_else(|| {
        log::warn!(
            "{} generation requested with no source image",
            options.family().as_str()
        );
        GenerateError::NoSourceImage
    })?;

    let raster = codec::decode(&source.bytes)?;

    let variants = match options {
        FamilyOptions::Rotate(opts) => {
            let rasters = rotate::generate(&raster, opts.angle_step, opts.count);
            name_rotations(&source.name, opts.angle_step, rasters)?
        }
        FamilyOptions::ColorCorrection(opts) => {
            let rasters = color::generate(&raster, &opts.adjustments, rng);
            name_color_corrections(&source.name, &opts.adjustments, rasters)?
        }
        FamilyOptions::Distortion(opts) => {
            let rasters = distort::generate(&raster, &opts.category, opts.elastic_budget, rng)?;
            name_distortions(&source.name, &opts.category, rasters)?
        }
    };

    let count = variants.len();
    // Generation ran outside the store lock; if the source was replaced in
    // the meantime this batch belongs to the old source and must not land.
    if !store.replace_batch_if_current(options.family(), variants, source.generation) {
        return Err(GenerateError::SourceReplaced);
    }
    Ok(count)
}

fn encode_variant(file_name: String, raster: &Raster) -> Result<Variant, EncodeError> {
    Ok(Variant {
        file_name,
        bytes: codec::encode(raster)?,
        media_type: VARIANT_MEDIA_TYPE.to_string(),
    })
}

/// `{name}_rotate_{i * angle_step}_degrees`, 1-indexed.
fn name_rotations(
    name: &str,
    angle_step: i32,
    rasters: Vec<Raster>,
) -> Result<Vec<Variant>, EncodeError> {
    rasters
        .iter()
        .enumerate()
        .map(|(i, raster)| {
            let degrees = (i as i64 + 1) * angle_step as i64;
            encode_variant(format!("{}_rotate_{}_degrees", name, degrees), raster)
        })
        .collect()
}

/// `{name}_color_correction_{adjustment}`, in request order over the
/// recognized adjustments only.
fn name_color_corrections(
    name: &str,
    tokens: &[String],
    rasters: Vec<Raster>,
) -> Result<Vec<Variant>, EncodeError> {
    tokens
        .iter()
        .filter_map(|token| color::AdjustmentKind::parse(token))
        .zip(rasters.iter())
        .map(|(kind, raster)| {
            encode_variant(format!("{}_color_correction_{}", name, kind.name()), raster)
        })
        .collect()
}

/// `{name}_{category}_{i}`, 1-indexed.
fn name_distortions(
    name: &str,
    category: &str,
    rasters: Vec<Raster>,
) -> Result<Vec<Variant>, EncodeError> {
    rasters
        .iter()
        .enumerate()
        .map(|(i, raster)| encode_variant(format!("{}_{}_{}", name, category, i + 1), raster))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn upload(store: &VariantStore, name: &str, width: u32, height: u32) {
        let raster = Raster::filled(width, height, [60, 120, 180]);
        let bytes = codec::encode(&raster).unwrap();
        store.replace_source(name, bytes, "image/jpeg").unwrap();
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_rotation_end_to_end() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 100, 100);

        let options = FamilyOptions::Rotate(RotateOptions {
            angle_step: 90,
            count: 4,
        });
        let stored = generate_family(&store, &options, &mut rng()).unwrap();
        assert_eq!(stored, 4);

        let batch = store.batch(TransformFamily::Rotate);
        let names: Vec<&str> = batch.iter().map(|v| v.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "bus_rotate_90_degrees",
                "bus_rotate_180_degrees",
                "bus_rotate_270_degrees",
                "bus_rotate_360_degrees",
            ]
        );

        for v in &batch {
            assert_eq!(v.media_type, "image/jpeg");
            let raster = codec::decode(&v.bytes).unwrap();
            assert_eq!(raster.width, 100);
            assert_eq!(raster.height, 100);
        }
    }

    #[test]
    fn test_rotation_count_too_large_before_raster_work() {
        let store = VariantStore::new();
        // No source uploaded: validation must fire first, so we see the
        // configuration error rather than NoSourceImage.
        let options = FamilyOptions::Rotate(RotateOptions {
            angle_step: 10,
            count: 150,
        });
        let result = generate_family(&store, &options, &mut rng());
        assert!(matches!(
            result,
            Err(GenerateError::Config(ConfigError::CountTooLarge { count: 150, max: 100 }))
        ));
    }

    #[test]
    fn test_rotation_invalid_options() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 10, 10);

        for (angle_step, count) in [(0, 4), (90, 0)] {
            let options = FamilyOptions::Rotate(RotateOptions { angle_step, count });
            let result = generate_family(&store, &options, &mut rng());
            assert!(matches!(result, Err(GenerateError::Config(_))));
        }
        // Nothing was stored.
        assert!(store.batch(TransformFamily::Rotate).is_empty());
    }

    #[test]
    fn test_no_source_image_leaves_store_untouched() {
        let store = VariantStore::new();
        let options = FamilyOptions::ColorCorrection(ColorCorrectionOptions {
            adjustments: vec!["grayscale".to_string()],
        });

        let result = generate_family(&store, &options, &mut rng());
        assert!(matches!(result, Err(GenerateError::NoSourceImage)));
        assert!(store.batch(TransformFamily::ColorCorrection).is_empty());
    }

    #[test]
    fn test_color_correction_names_skip_unknown() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 20, 20);

        let options = FamilyOptions::ColorCorrection(ColorCorrectionOptions {
            adjustments: vec![
                "grayscale".to_string(),
                "vignette".to_string(),
                "inversion".to_string(),
            ],
        });
        let stored = generate_family(&store, &options, &mut rng()).unwrap();
        assert_eq!(stored, 2);

        let batch = store.batch(TransformFamily::ColorCorrection);
        assert_eq!(batch[0].file_name, "bus_color_correction_grayscale");
        assert_eq!(batch[1].file_name, "bus_color_correction_inversion");
    }

    #[test]
    fn test_distortion_names_indexed() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 30, 30);

        let options = FamilyOptions::Distortion(DistortionOptions {
            category: "blur".to_string(),
            elastic_budget: None,
        });
        let stored = generate_family(&store, &options, &mut rng()).unwrap();
        assert_eq!(stored, 3);

        let batch = store.batch(TransformFamily::Distortion);
        let names: Vec<&str> = batch.iter().map(|v| v.file_name.as_str()).collect();
        assert_eq!(names, vec!["bus_blur_1", "bus_blur_2", "bus_blur_3"]);
    }

    #[test]
    fn test_distortion_unknown_category_stores_empty_batch() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 20, 20);

        // First put something in the batch, then regenerate with an unknown
        // category: the old batch must be fully replaced by nothing.
        let blur = FamilyOptions::Distortion(DistortionOptions {
            category: "blur".to_string(),
            elastic_budget: None,
        });
        generate_family(&store, &blur, &mut rng()).unwrap();
        assert_eq!(store.batch(TransformFamily::Distortion).len(), 3);

        let unknown = FamilyOptions::Distortion(DistortionOptions {
            category: "unknown_value".to_string(),
            elastic_budget: None,
        });
        let stored = generate_family(&store, &unknown, &mut rng()).unwrap();
        assert_eq!(stored, 0);
        assert!(store.batch(TransformFamily::Distortion).is_empty());
    }

    #[test]
    fn test_elastic_timeout_keeps_previous_batch() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 40, 40);

        let blur = FamilyOptions::Distortion(DistortionOptions {
            category: "blur".to_string(),
            elastic_budget: None,
        });
        generate_family(&store, &blur, &mut rng()).unwrap();

        let strangled = FamilyOptions::Distortion(DistortionOptions {
            category: "distortion".to_string(),
            elastic_budget: Some(std::time::Duration::ZERO),
        });
        let result = generate_family(&store, &strangled, &mut rng());
        assert!(matches!(result, Err(GenerateError::Distort(_))));

        // The failed generation stored nothing; the blur batch survives.
        assert_eq!(store.batch(TransformFamily::Distortion).len(), 3);
    }

    #[test]
    fn test_concurrent_source_replacement_never_yields_stale_batch() {
        use std::sync::Arc;

        let store = Arc::new(VariantStore::new());
        upload(&store, "first.jpg", 400, 400);

        let worker = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let options = FamilyOptions::Rotate(RotateOptions {
                    angle_step: 7,
                    count: 20,
                });
                generate_family(&store, &options, &mut rng())
            })
        };

        // Replace the source while the rotation batch is likely in flight.
        std::thread::sleep(std::time::Duration::from_millis(5));
        upload(&store, "second.jpg", 10, 10);

        let result = worker.join().unwrap();
        let batch = store.batch(TransformFamily::Rotate);

        // Whichever way the race went, no variant of the replaced source
        // may be associated with the current one.
        assert!(
            batch.iter().all(|v| !v.file_name.starts_with("first_")),
            "stale variants survived the source replacement"
        );
        match result {
            // Worker finished before the replacement (batch then cleared)
            // or started after it (batch belongs to the new source).
            Ok(_) => assert!(
                batch.is_empty() || batch.iter().all(|v| v.file_name.starts_with("second_"))
            ),
            Err(GenerateError::SourceReplaced) => assert!(batch.is_empty()),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.source().unwrap().name, "second");
    }

    #[test]
    fn test_regeneration_replaces_batch() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 20, 20);

        let four = FamilyOptions::Rotate(RotateOptions {
            angle_step: 90,
            count: 4,
        });
        generate_family(&store, &four, &mut rng()).unwrap();

        let two = FamilyOptions::Rotate(RotateOptions {
            angle_step: 45,
            count: 2,
        });
        generate_family(&store, &two, &mut rng()).unwrap();

        let batch = store.batch(TransformFamily::Rotate);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].file_name, "bus_rotate_45_degrees");
        assert_eq!(batch[1].file_name, "bus_rotate_90_degrees");
    }

    #[test]
    fn test_negative_angle_step_naming() {
        let store = VariantStore::new();
        upload(&store, "bus.jpg", 10, 10);

        let options = FamilyOptions::Rotate(RotateOptions {
            angle_step: -90,
            count: 2,
        });
        generate_family(&store, &options, &mut rng()).unwrap();

        let batch = store.batch(TransformFamily::Rotate);
        assert_eq!(batch[0].file_name, "bus_rotate_-90_degrees");
        assert_eq!(batch[1].file_name, "bus_rotate_-180_degrees");
    }

    #[test]
    fn test_options_family_mapping() {
        let rotate = FamilyOptions::Rotate(RotateOptions {
            angle_step: 1,
            count: 1,
        });
        assert_eq!(rotate.family(), TransformFamily::Rotate);

        let color = FamilyOptions::ColorCorrection(ColorCorrectionOptions {
            adjustments: vec![],
        });
        assert_eq!(color.family(), TransformFamily::ColorCorrection);

        let distortion = FamilyOptions::Distortion(DistortionOptions {
            category: "noise".to_string(),
            elastic_budget: None,
        });
        assert_eq!(distortion.family(), TransformFamily::Distortion);
    }
}
