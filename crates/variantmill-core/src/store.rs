//! Session-scoped variant store.
//!
//! Holds the single current source image and one batch of derived variants
//! per transform family. The store enforces the replacement protocol:
//!
//! - Uploading a new source wholesale-replaces the previous one and clears
//!   every batch (old variants never outlive their source).
//! - Replacing a family's batch removes the old entries and inserts the new
//!   ones under one write lock, so readers never observe a mix.
//! - Each source replacement bumps a generation counter; a batch stored via
//!   [`VariantStore::replace_batch_if_current`] is dropped when its source
//!   is no longer current, so a batch never outlives the source it was
//!   derived from even when generation races a replacement.
//!
//! The store is ephemeral and in-memory; durable persistence belongs to
//! external collaborators.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::codec::{self, DecodeError};

/// A transform family, each with its own options shape and generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TransformFamily {
    Rotate,
    ColorCorrection,
    Distortion,
}

impl TransformFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rotate => "rotate",
            Self::ColorCorrection => "color_correction",
            Self::Distortion => "distortion",
        }
    }
}

/// The current source image: the upload's bytes, declared media type, and
/// logical name with the file extension stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// Monotonic upload counter identifying the replacement this record came
    /// from. Pass it to [`VariantStore::replace_batch_if_current`] so a batch
    /// generated from this source is dropped if the source has since been
    /// replaced.
    pub generation: u64,
}

/// One derived image. `file_name` is the contract collaborators use as the
/// on-disk name when persisting a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
}

#[derive(Debug, Default)]
struct StoreInner {
    source: Option<SourceImage>,
    batches: HashMap<TransformFamily, Vec<Variant>>,
    // Bumped on every source replacement (and on clear). Guards against
    // storing a batch that was generated from a source no longer current.
    generation: u64,
}

/// In-memory store for the source image and per-family variant batches.
#[derive(Debug, Default)]
pub struct VariantStore {
    inner: RwLock<StoreInner>,
}

impl VariantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the source image, clearing all derived batches.
    ///
    /// The bytes are probe-decoded first so an invalid upload is rejected
    /// here ("not a valid image") and never becomes the source. The logical
    /// name is stored with its extension stripped.
    pub fn replace_source(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        media_type: &str,
    ) -> Result<(), DecodeError> {
        codec::decode(&bytes)?;

        let name = match file_name.rsplit_once('.') {
            Some((stem, _ext)) => stem.to_string(),
            None => file_name.to_string(),
        };

        let mut inner = self.write_lock();
        let generation = inner.generation + 1;
        inner.generation = generation;
        inner.batches.clear();
        inner.source = Some(SourceImage {
            name: name.clone(),
            bytes,
            media_type: media_type.to_string(),
            generation,
        });
        log::info!(
            "replaced source image \"{}\" ({}), generation {}",
            name,
            media_type,
            generation
        );
        Ok(())
    }

    /// Get a copy of the current source image, if any.
    pub fn source(&self) -> Option<SourceImage> {
        self.read_lock().source.clone()
    }

    /// Atomically replace the batch for one family, unconditionally.
    pub fn replace_batch(&self, family: TransformFamily, variants: Vec<Variant>) {
        let mut inner = self.write_lock();
        log::info!(
            "replacing {} batch: {} -> {} variants",
            family.as_str(),
            inner.batches.get(&family).map_or(0, Vec::len),
            variants.len()
        );
        inner.batches.insert(family, variants);
    }

    /// Replace the batch for one family, unless the source image has been
    /// replaced since `generation` was captured from [`SourceImage`].
    /// Returns whether the batch was stored.
    ///
    /// Generation work runs outside the store lock, so a slow batch can
    /// race a concurrent source replacement. The replacement clears every
    /// batch; a late write from the old source must be dropped here or its
    /// variants would be associated with the new source.
    pub fn replace_batch_if_current(
        &self,
        family: TransformFamily,
        variants: Vec<Variant>,
        generation: u64,
    ) -> bool {
        let mut inner = self.write_lock();
        if inner.generation != generation {
            log::warn!(
                "dropping stale {} batch ({} variants): source replaced during generation",
                family.as_str(),
                variants.len()
            );
            return false;
        }
        log::info!(
            "replacing {} batch: {} -> {} variants",
            family.as_str(),
            inner.batches.get(&family).map_or(0, Vec::len),
            variants.len()
        );
        inner.batches.insert(family, variants);
        true
    }

    /// Get a copy of the current batch for one family. Empty if the family
    /// has not been generated since the last source replacement.
    pub fn batch(&self, family: TransformFamily) -> Vec<Variant> {
        self.read_lock()
            .batches
            .get(&family)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the source and every batch (session teardown). Also invalidates
    /// any in-flight generation against the dropped source.
    pub fn clear(&self) {
        let mut inner = self.write_lock();
        inner.generation += 1;
        inner.source = None;
        inner.batches.clear();
    }

    /// True if no source image is set.
    pub fn is_empty(&self) -> bool {
        self.read_lock().source.is_none()
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        // A poisoned lock means a panic mid-write; the inner state is still
        // structurally valid (batches are replaced whole), so recover.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
