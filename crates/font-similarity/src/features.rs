use std::collections::HashSet;
use tracing::trace;
use font_core::{
    FeatureDimension, FeatureVector, GlyphOutline, PathCommand, StructuralFont, FEATURE_COUNT,
};

/// Characters whose outlines are sampled; the first three are the serif probes.
pub const SAMPLE_CHARS: [char; 19] = [
    'I', 'l', 'T', 'H', 'o', 'e', 'a', 'A', 'B', 'C', 'D', 'n', 'p', 'q', 'r', '0', '1', '2', '3',
];

/// Em size, in abstract units, that outlines are scaled to before analysis
pub const NOMINAL_SIZE: f32 = 72.0;

const DEFAULT_X_HEIGHT: f32 = 0.48;
const DEFAULT_CAP_HEIGHT: f32 = 0.70;
const DEFAULT_AVG_WIDTH: f32 = 0.5;
const DEFAULT_CONTRAST: f32 = 0.3;
const DEFAULT_ROUNDNESS: f32 = 0.5;
const DEFAULT_COMMANDS_PER_GLYPH: f32 = 20.0;
const COMPLEXITY_SCALE: f32 = 80.0;
const PANOSE_PROPORTION_MONOSPACED: u8 = 9;

/// Substitutes for values that come out non-finite
const DEFAULTS: [f32; FEATURE_COUNT] = [
    400.0 / 900.0,
    0.5,
    DEFAULT_X_HEIGHT,
    DEFAULT_CAP_HEIGHT,
    0.8,
    0.2,
    DEFAULT_AVG_WIDTH,
    0.5,
    DEFAULT_CONTRAST,
    DEFAULT_ROUNDNESS,
    0.0,
    0.0,
    0.0,
    0.0,
    DEFAULT_COMMANDS_PER_GLYPH / COMPLEXITY_SCALE,
];

/// Turns a structural font into a [`FeatureVector`].
///
/// Extraction never fails: every measurement that cannot be taken falls back
/// to a fixed constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

/// Aggregates collected while walking the sampled glyphs
#[derive(Debug, Default)]
struct GlyphSample {
    glyphs: usize,
    commands: usize,
    curves: usize,
    lines: usize,
    advances: Vec<u16>,
    probe_counts: [Option<usize>; 3],
    contrast: Option<f32>,
}

impl FeatureExtractor {
    pub fn extract<F: StructuralFont + ?Sized>(&self, font: &F) -> FeatureVector {
        let upm = f32::from(font.units_per_em().max(1));
        let os2 = font.os2();
        let sample = Self::sample_glyphs(font, upm);

        let weight_class = os2.map_or(400.0, |o| f32::from(o.weight_class));
        let width_class = os2.map_or(5.0, |o| f32::from(o.width_class));

        let x_height = os2
            .and_then(|o| o.x_height)
            .filter(|h| *h > 0)
            .map(|h| f32::from(h) / upm)
            .or_else(|| Self::glyph_height(font, 'x', upm))
            .unwrap_or(DEFAULT_X_HEIGHT);

        let cap_height = os2
            .and_then(|o| o.cap_height)
            .filter(|h| *h > 0)
            .map(|h| f32::from(h) / upm)
            .or_else(|| Self::glyph_height(font, 'H', upm))
            .unwrap_or(DEFAULT_CAP_HEIGHT);

        let (ascender, descender) = match os2 {
            Some(o) => (f32::from(o.typo_ascender), f32::from(o.typo_descender)),
            None => (f32::from(font.ascender()), f32::from(font.descender())),
        };

        let avg_width = os2
            .map(|o| o.avg_char_width)
            .filter(|w| *w > 0)
            .map(|w| f32::from(w) / upm)
            .or_else(|| Self::mean_lowercase_advance(font, upm))
            .unwrap_or(DEFAULT_AVG_WIDTH);

        let panose = os2.map(|o| o.panose).unwrap_or_default();
        let monospace = font.is_fixed_pitch()
            || panose[3] == PANOSE_PROPORTION_MONOSPACED
            || Self::uniform_advances(&sample.advances);

        let roundness = if sample.curves + sample.lines == 0 {
            DEFAULT_ROUNDNESS
        } else {
            sample.curves as f32 / (sample.curves + sample.lines) as f32
        };

        let commands_per_glyph = if sample.glyphs == 0 {
            DEFAULT_COMMANDS_PER_GLYPH
        } else {
            sample.commands as f32 / sample.glyphs as f32
        };

        let mut values = [0.0; FEATURE_COUNT];
        values[FeatureDimension::WeightClass.index()] = weight_class / 900.0;
        values[FeatureDimension::WidthClass.index()] = (width_class - 1.0) / 8.0;
        values[FeatureDimension::XHeight.index()] = x_height;
        values[FeatureDimension::CapHeight.index()] = cap_height;
        values[FeatureDimension::Ascender.index()] = ascender / upm;
        values[FeatureDimension::Descender.index()] = descender.abs() / upm;
        values[FeatureDimension::AverageWidth.index()] = avg_width;
        values[FeatureDimension::SerifScore.index()] = Self::serif_score(&sample.probe_counts);
        values[FeatureDimension::Contrast.index()] = sample.contrast.unwrap_or(DEFAULT_CONTRAST);
        values[FeatureDimension::Roundness.index()] = roundness;
        values[FeatureDimension::Monospace.index()] = if monospace { 1.0 } else { 0.0 };
        values[FeatureDimension::ItalicAngle.index()] = font.italic_angle().abs() / 45.0;
        values[FeatureDimension::PanoseSerif.index()] = f32::from(panose[1]) / 15.0;
        values[FeatureDimension::PanoseWeight.index()] = f32::from(panose[2]) / 15.0;
        values[FeatureDimension::Complexity.index()] = commands_per_glyph / COMPLEXITY_SCALE;

        for (value, default) in values.iter_mut().zip(DEFAULTS) {
            if !value.is_finite() {
                *value = default;
            }
        }

        trace!(
            glyphs = sample.glyphs,
            commands = sample.commands,
            monospace,
            "extracted feature vector"
        );
        FeatureVector::new(values)
    }

    fn sample_glyphs<F: StructuralFont + ?Sized>(font: &F, upm: f32) -> GlyphSample {
        let mut sample = GlyphSample::default();
        let scale = NOMINAL_SIZE / upm;

        for (i, ch) in SAMPLE_CHARS.iter().enumerate() {
            let Some(glyph) = font.glyph(*ch) else {
                continue;
            };
            let path = Self::scaled_path(&glyph, scale);

            sample.glyphs += 1;
            sample.commands += path.len();
            sample.curves += path.iter().filter(|c| c.is_curve()).count();
            sample.lines += path.iter().filter(|c| c.is_line()).count();
            if let Some(advance) = glyph.advance_width {
                sample.advances.push(advance);
            }
            if i < sample.probe_counts.len() {
                sample.probe_counts[i] = Some(path.len());
            }
            if *ch == 'o' {
                sample.contrast = Self::contrast(&path);
            }
        }
        sample
    }

    /// Outline in nominal-size screen space (y grows downwards)
    fn scaled_path(glyph: &GlyphOutline, scale: f32) -> Vec<PathCommand> {
        glyph
            .commands
            .iter()
            .map(|c| c.map(|x, y| (x * scale, -y * scale)))
            .collect()
    }

    /// Signed command-count score over the `I`, `l`, `T` probes, mapped to 0..1
    fn serif_score(probe_counts: &[Option<usize>; 3]) -> f32 {
        let mut score: i32 = 0;
        if let Some(n) = probe_counts[0] {
            score += if n > 12 {
                3
            } else if n <= 6 {
                -3
            } else {
                -1
            };
        }
        if let Some(n) = probe_counts[1] {
            if n > 10 {
                score += 2;
            } else if n <= 6 {
                score -= 2;
            }
        }
        if let Some(n) = probe_counts[2] {
            if n > 16 {
                score += 1;
            } else if n <= 8 {
                score -= 1;
            }
        }
        ((score + 8) as f32 / 14.0).clamp(0.0, 1.0)
    }

    /// Stroke contrast of a path: imbalance between vertical and horizontal travel.
    fn contrast(path: &[PathCommand]) -> Option<f32> {
        let points: Vec<(f32, f32)> = path.iter().filter_map(|c| c.end_point()).collect();
        let mut vertical = 0.0;
        let mut horizontal = 0.0;

        for pair in points.windows(2) {
            let dx = (pair[1].0 - pair[0].0).abs();
            let dy = (pair[1].1 - pair[0].1).abs();
            if dy > 2.0 * dx {
                vertical += dy;
            } else if dx > 2.0 * dy {
                horizontal += dx;
            }
        }

        let total = vertical + horizontal;
        if total > 0.0 {
            Some(((vertical - horizontal).abs() / total).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    fn uniform_advances(advances: &[u16]) -> bool {
        if advances.len() < 3 {
            return false;
        }
        let distinct: HashSet<u16> = advances.iter().copied().collect();
        distinct.len() <= 2
    }

    fn glyph_height<F: StructuralFont + ?Sized>(font: &F, ch: char, upm: f32) -> Option<f32> {
        let bounds = font.glyph(ch)?.bounds?;
        (bounds.y_max > 0).then(|| f32::from(bounds.y_max) / upm)
    }

    fn mean_lowercase_advance<F: StructuralFont + ?Sized>(font: &F, upm: f32) -> Option<f32> {
        let advances: Vec<f32> = ('a'..='z')
            .filter_map(|ch| font.glyph(ch)?.advance_width)
            .map(f32::from)
            .collect();
        if advances.is_empty() {
            return None;
        }
        Some(advances.iter().sum::<f32>() / advances.len() as f32 / upm)
    }
}

pub fn extract<F: StructuralFont + ?Sized>(font: &F) -> FeatureVector {
    FeatureExtractor.extract(font)
}
