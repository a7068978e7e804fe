//! Color-correction variants.
//!
//! One variant per requested named adjustment, each a pure function of the
//! source raster. Four of the six adjustments draw a parameter from the
//! caller's RNG fresh per invocation; with an OS-seeded RNG the outputs are
//! deliberately non-reproducible, so tests assert structural properties
//! rather than exact pixels (inversion being the bit-exact exception).
//!
//! Hue and saturation work in 8-bit HSV with hue in `[0, 180)`. Saturation
//! scaling clamps via min/max while hue shifting wraps modulo 180; the
//! asymmetry is intentional per-channel semantics, not an oversight.

use rand::Rng;

use crate::codec::Raster;

/// The fixed vocabulary of color adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AdjustmentKind {
    /// Luma conversion, replicated back to three channels.
    Grayscale,
    /// Uniform channel offset in [-50, 50].
    Brightness,
    /// Uniform channel scale in [0.5, 1.5].
    Contrast,
    /// HSV saturation scale in [0.5, 1.5], clamped.
    Saturation,
    /// HSV hue offset in [-20, 20], wrapped modulo 180.
    Hue,
    /// Bitwise complement of every channel.
    Inversion,
}

impl AdjustmentKind {
    /// Parse an adjustment token. Unknown tokens yield `None` and are
    /// silently skipped by the generator; collaborators rely on being able
    /// to pass extra tokens harmlessly.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "grayscale" => Some(Self::Grayscale),
            "brightness" => Some(Self::Brightness),
            "contrast" => Some(Self::Contrast),
            "saturation" => Some(Self::Saturation),
            "hue" => Some(Self::Hue),
            "inversion" => Some(Self::Inversion),
            _ => None,
        }
    }

    /// Token used in variant file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Hue => "hue",
            Self::Inversion => "inversion",
        }
    }
}

/// Generate one variant per recognized adjustment token, in request order.
///
/// Unknown tokens are dropped without error. Every adjustment is applied to
/// the source, never chained onto a previous variant.
pub fn generate<R: Rng>(source: &Raster, tokens: &[String], rng: &mut R) -> Vec<Raster> {
    tokens
        .iter()
        .filter_map(|token| AdjustmentKind::parse(token))
        .map(|kind| apply(source, kind, rng))
        .collect()
}

/// Apply a single adjustment, sampling its parameter (if any) from the RNG.
pub fn apply<R: Rng>(source: &Raster, kind: AdjustmentKind, rng: &mut R) -> Raster {
    match kind {
        AdjustmentKind::Grayscale => grayscale(source),
        AdjustmentKind::Brightness => brightness(source, rng.random_range(-50..=50)),
        AdjustmentKind::Contrast => contrast(source, rng.random_range(0.5..=1.5)),
        AdjustmentKind::Saturation => scale_saturation(source, rng.random_range(0.5..=1.5)),
        AdjustmentKind::Hue => shift_hue(source, rng.random_range(-20..=20)),
        AdjustmentKind::Inversion => invert(source),
    }
}

/// Convert to BT.601 luma and replicate to all three channels.
pub fn grayscale(source: &Raster) -> Raster {
    let mut out = source.clone();
    for chunk in out.pixels.chunks_exact_mut(3) {
        let (b, g, r) = (chunk[0] as f32, chunk[1] as f32, chunk[2] as f32);
        let y = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
        chunk.fill(y);
    }
    out
}

/// Add `offset` to every channel, clamped to [0, 255].
pub fn brightness(source: &Raster, offset: i32) -> Raster {
    let mut out = source.clone();
    for v in &mut out.pixels {
        *v = (*v as i32 + offset).clamp(0, 255) as u8;
    }
    out
}

/// Scale every channel by `factor` about zero, clamped to [0, 255].
pub fn contrast(source: &Raster, factor: f32) -> Raster {
    let mut out = source.clone();
    for v in &mut out.pixels {
        *v = (*v as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Scale the HSV saturation channel by `factor`, clamped via min/max.
pub fn scale_saturation(source: &Raster, factor: f32) -> Raster {
    let mut out = source.clone();
    for chunk in out.pixels.chunks_exact_mut(3) {
        let [h, s, v] = hsv_from_bgr([chunk[0], chunk[1], chunk[2]]);
        let s = (s as f32 * factor).round().clamp(0.0, 255.0) as u8;
        let bgr = bgr_from_hsv([h, s, v]);
        chunk.copy_from_slice(&bgr);
    }
    out
}

/// Add `offset` to the HSV hue channel, wrapped modulo 180.
pub fn shift_hue(source: &Raster, offset: i32) -> Raster {
    let mut out = source.clone();
    for chunk in out.pixels.chunks_exact_mut(3) {
        let [h, s, v] = hsv_from_bgr([chunk[0], chunk[1], chunk[2]]);
        let h = (h as i32 + offset).rem_euclid(180) as u8;
        let bgr = bgr_from_hsv([h, s, v]);
        chunk.copy_from_slice(&bgr);
    }
    out
}

/// Bitwise-complement every channel. Self-inverse, bit-exact.
pub fn invert(source: &Raster) -> Raster {
    let mut out = source.clone();
    for v in &mut out.pixels {
        *v = 255 - *v;
    }
    out
}

/// BGR to 8-bit HSV: H in [0, 180), S and V in [0, 255].
fn hsv_from_bgr(bgr: [u8; 3]) -> [u8; 3] {
    let (b, g, r) = (bgr[0] as f32, bgr[1] as f32, bgr[2] as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        (h / 2.0).round().clamp(0.0, 179.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    ]
}

/// 8-bit HSV back to BGR.
fn bgr_from_hsv(hsv: [u8; 3]) -> [u8; 3] {
    let h_deg = hsv[0] as f32 * 2.0;
    let s = hsv[1] as f32 / 255.0;
    let v = hsv[2] as f32 / 255.0;

    let c = v * s;
    let x = c * (1.0 - ((h_deg / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h_deg / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        ((b + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((g + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        ((r + m) * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
